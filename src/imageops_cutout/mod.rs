pub mod alpha_denoise;
pub mod apply_alpha_mask;
pub mod box_filter;
pub mod components;
pub mod compositor;
pub mod locate;
pub mod matting;
pub mod outcome;
pub mod summed_area_table;
pub mod trimap;
