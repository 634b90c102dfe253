//! Mini City Library
//!
//! A tile-grid city where one agent drives a planned route past traffic
//! lights, NPC traffic, pedestrians and temporary roadblocks.

pub mod simulation;
