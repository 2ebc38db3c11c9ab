pub mod intent;
pub mod params;
pub mod presets;
