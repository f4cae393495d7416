pub mod api;
pub mod cli;
pub mod config;
pub mod draft;
pub mod logging;
pub mod manager;
pub mod models;
pub mod store;
pub mod tui;
pub mod utils;
pub mod view;

pub use config::Config;
pub use manager::TaskManager;
pub use models::{Category, Tag, Task};
pub use utils::Profile;
