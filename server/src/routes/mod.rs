pub mod api;
pub mod map_colors;
