pub mod hit;
pub mod paint;
pub mod shapes;

pub use hit::{hit_test, hit_test_scene};
pub use paint::{paint_scene, paint_shapes, viewport_transform};
pub use shapes::{Block, Connector, Cylinder, Shape, ShapeView, ViewState, build_shapes};
