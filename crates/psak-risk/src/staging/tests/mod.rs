mod common;
mod engine;
mod simulator;
