pub mod controls;
pub mod history;
pub mod recording;
