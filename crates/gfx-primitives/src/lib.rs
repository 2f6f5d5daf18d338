//! Pure 2D geometry, clipping, and dirty-region aggregation.
//!
//! Nothing in this crate touches shared memory, locks, or I/O: it is the
//! bottom layer every other crate in the workspace builds on.

pub mod clip;
pub mod geometry;
pub mod updates;

pub use clip::{clip_blit_flipped_rotated, clip_line, clip_rectangle, clip_triangle, BlitFlags, OutCode};
pub use geometry::{region_rectangle_intersect, Line, Point, Rectangle, Region, Triangle};
pub use updates::Updates;
