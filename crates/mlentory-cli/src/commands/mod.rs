pub mod reconstruct;
pub mod run;
pub mod serve;
