/// Rendering: 2D planes → fixed-size PNG bytes.
///
/// ```text
///  ArrayView2<f32> (plane of a volume)
///        │
///        ▼
///   ┌──────────┐
///   │  raster   │  rotate / flip, scale to gray or label colours, letterbox
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  encode   │  DynamicImage → PNG bytes (with pHYs DPI)
///   └──────────┘
/// ```

pub mod encode;
pub mod raster;
