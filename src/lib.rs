//! PNG <-> JPEG batch converter built on self-contained codecs: a zlib
//! inflater and stored-block deflater, a PNG chunk/filter layer, and a
//! baseline JPEG decoder and encoder, none of which lean on external codec
//! libraries.

mod bitreader;
mod bitwriter;
mod checksum;
mod color_spaces;
mod convert;
mod dct;
mod deflate;
mod error;
mod frame_header;
mod huffman;
mod image;
mod inflate;
mod jpeg_decoder;
mod jpeg_encoder;
mod jpeg_parser;
mod jpeg_tables;
mod marker;
mod png_decoder;
mod png_encoder;
mod scan_header;
mod scan_reader;

pub use convert::{jpeg_to_png, png_to_jpeg};
pub use error::{Error, Result};
pub use image::PixelBuffer;
pub use jpeg_decoder::decode_jpeg;
pub use jpeg_encoder::encode_jpeg;
pub use png_decoder::decode_png;
pub use png_encoder::encode_png;
