pub mod clutch;
pub mod config;
pub mod error;
pub mod fallback;
pub mod game_clock;
pub mod http_client;
pub mod narration;
pub mod outcome;
pub mod props;
pub mod roster;
pub mod runner;
pub mod script;
pub mod script_gen;
pub mod simulator;
pub mod stat_parser;
pub mod state;
