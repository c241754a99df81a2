//! Decoding the supported input encodings into point streams.

pub mod flat;
pub mod frame;
pub mod ply;

use crate::{Colors, PointData};

#[derive(Clone, Debug, PartialEq)]
pub enum ColorBuffer {
    Rgb(Vec<glam::Vec3>),
    Rgba(Vec<glam::Vec4>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    pub positions: Vec<glam::Vec3>,
    pub colors: ColorBuffer,
}

impl Model {
    pub fn points(&self) -> PointData<'_> {
        PointData {
            positions: &self.positions,
            colors: match self.colors {
                ColorBuffer::Rgb(ref c) => Colors::Rgb(c),
                ColorBuffer::Rgba(ref c) => Colors::Rgba(c),
            },
        }
    }
}

pub fn load(file_name: &str) -> crate::Result<Model> {
    if file_name.ends_with(".ply") {
        ply::load(file_name)
    } else {
        Err(crate::Error::InvalidArgument(format!(
            "Unsupported file name: {}",
            file_name
        )))
    }
}
