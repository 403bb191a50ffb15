pub mod constants;
pub mod agent;
pub mod store;
pub mod spatial;
pub mod clock;
pub mod scenario;
pub mod command_buffer;
pub mod systems;
pub mod tactical;
pub mod simulation;
