pub mod input;

pub mod alerts_controller;
pub mod bot_controller;
pub mod health_controller;
