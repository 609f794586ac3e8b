pub mod capture;
pub mod video;

pub use capture::{OpenCvCamera, ThreadedCamera};
pub use video::{VideoReader, VideoSink};
