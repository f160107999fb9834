// Domain layer - Space weather series, chart rules and widget model
pub mod chart_scale;
pub mod space_weather;
pub mod widget;
