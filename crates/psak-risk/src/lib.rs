//! PSAK 71 credit-risk evaluation core: staging rules, collectibility
//! migration matrices, forward-looking scenario adjustment and ECL.

pub mod config;
pub mod ecl;
pub mod error;
pub mod fla;
pub mod migration;
pub mod staging;
pub mod telemetry;
