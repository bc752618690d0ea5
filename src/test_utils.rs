//! Builders for small test gifs.
//!
//! Frames are encoded with the `gif` crate's own encoder. With fewer than 256
//! colors per frame the palette is exact, so decoding gives back the pixels
//! that went in.

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

pub struct TestFrame {
  width: u16,
  height: u16,
  left: u16,
  top: u16,
  rgba: Vec<u8>,
  dispose: gif::DisposalMethod,
  delay: u16,
}

impl TestFrame {
  pub fn solid(width: u16, height: u16, color: [u8; 4]) -> TestFrame {
    let rgba = color
      .iter()
      .copied()
      .cycle()
      .take(width as usize * height as usize * 4)
      .collect();
    TestFrame {
      width,
      height,
      left: 0,
      top: 0,
      rgba,
      dispose: gif::DisposalMethod::Any,
      delay: 0,
    }
  }

  pub fn at(mut self, left: u16, top: u16) -> TestFrame {
    self.left = left;
    self.top = top;
    self
  }

  pub fn dispose(mut self, dispose: gif::DisposalMethod) -> TestFrame {
    self.dispose = dispose;
    self
  }

  /// In hundredths of a second, as stored in the gif.
  pub fn delay(mut self, delay: u16) -> TestFrame {
    self.delay = delay;
    self
  }
}

pub fn encode_gif(width: u16, height: u16, frames: &[TestFrame]) -> Vec<u8> {
  let mut bytes = Vec::new();
  {
    let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[]).unwrap();
    for test_frame in frames {
      let mut rgba = test_frame.rgba.clone();
      let mut frame =
        gif::Frame::from_rgba_speed(test_frame.width, test_frame.height, &mut rgba, 10);
      frame.left = test_frame.left;
      frame.top = test_frame.top;
      frame.dispose = test_frame.dispose;
      frame.delay = test_frame.delay;
      encoder.write_frame(&frame).unwrap();
    }
  }
  bytes
}

/// Red full canvas that clears to background, a blue top-left quadrant, then
/// a transparent pixel.
pub fn quadrant_gif() -> Vec<u8> {
  encode_gif(10, 10, &[
    TestFrame::solid(10, 10, RED)
      .dispose(gif::DisposalMethod::Background)
      .delay(10),
    TestFrame::solid(5, 5, BLUE).delay(20),
    TestFrame::solid(1, 1, CLEAR),
  ])
}
