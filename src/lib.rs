pub mod archive;
pub mod botanists;
pub mod common;
pub mod config;
pub mod dashboard;
pub mod external;
pub mod pipeline;
pub mod plants;
pub mod recordings;
pub mod routes;
