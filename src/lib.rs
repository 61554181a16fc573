pub mod escape;
pub mod fec;
pub mod codec;
pub mod header;
pub mod integrity;
pub mod sink;
pub mod pipeline;
pub mod transmit;

pub use escape::{unescape, FramingError};
pub use fec::{FecDecoder, FecError, FecOutput, FecParams, ReedSolomon};
pub use codec::{inflate, CompressionError};
pub use header::{TransmissionHeader, HeaderError};
pub use integrity::{verify, IntegrityReport};
pub use sink::{OutputSink, FileSink, SinkError};
pub use pipeline::{
    decode_transmission, extract, extract_file,
    DecodeReport, DecodedTransmission, ExtractError, ExtractOptions, Extractor, Stage,
};
