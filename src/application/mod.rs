// Application layer - Use cases and ports
pub mod errors;
pub mod space_weather_source;
pub mod widget_ports;
pub mod widget_service;
