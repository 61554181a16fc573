//! The decode pipeline.
//!
//! ```text
//! Start → Unescaped → FecDecoded → Decompressed → HeaderParsed → IntegrityChecked → Written
//!   └──────────┴───────────┴─────────────┴──────────────┴────────────────┴──→ Failed
//! ```
//!
//! Each stage consumes the previous stage's buffer and hands its own on; no
//! stage runs twice and none goes back.  Every failure is terminal except an
//! MD5 mismatch, which is reported in [`DecodeReport`] and logged, after
//! which the save is still written.
//!
//! ```no_run
//! use sgex::pipeline::{extract_file, ExtractOptions};
//!
//! let report = extract_file("capture.bin", &ExtractOptions::default())?;
//! println!("{} ({} bytes)", report.filename, report.save_file_size);
//! # Ok::<(), sgex::pipeline::ExtractError>(())
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::codec::{self, CompressionError};
use crate::escape::{self, FramingError};
use crate::fec::{FecDecoder, FecError, FecParams, ReedSolomon};
use crate::header::{HeaderError, TransmissionHeader, HEADER_SIZE};
use crate::integrity::{self, IntegrityReport};
use crate::sink::{FileSink, OutputSink, SinkError};

// ── Stage ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Unescaped,
    FecDecoded,
    Decompressed,
    HeaderParsed,
    IntegrityChecked,
    Written,
}

impl Stage {
    fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Start            => Some(Unescaped),
            Unescaped        => Some(FecDecoded),
            FecDecoded       => Some(Decompressed),
            Decompressed     => Some(HeaderParsed),
            HeaderParsed     => Some(IntegrityChecked),
            IntegrityChecked => Some(Written),
            Written          => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Forward-only stage tracker.  The only move is to the successor, so a
/// stage can be neither skipped nor revisited.  `Written` is terminal.
#[derive(Debug, Clone, Copy)]
struct Progress(Stage);

impl Progress {
    fn advance(&mut self) -> Stage {
        if let Some(to) = self.0.next() {
            log::debug!("stage {} -> {}", self.0, to);
            self.0 = to;
        }
        self.0
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Terminal failure of a run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not open {path} for reading: {source}")]
    Input { path: PathBuf, #[source] source: io::Error },
    #[error("Failed to unescape data, something is corrupt: {0}")]
    Framing(#[from] FramingError),
    #[error("Reed Solomon couldn't decode buffer: {0}")]
    Fec(#[from] FecError),
    #[error("Failed to decompress transmission: {0}")]
    Compression(#[from] CompressionError),
    #[error("Invalid transmission header: {0}")]
    Header(#[from] HeaderError),
    /// The save was recovered but could not be stored.  `report` carries
    /// everything the run learned; its `output_path` is the refused target.
    #[error("{source}")]
    Output { report: Box<DecodeReport>, #[source] source: SinkError },
}

impl ExtractError {
    /// The last stage the run completed before failing.
    pub fn stage(&self) -> Stage {
        match self {
            ExtractError::Input { .. }    => Stage::Start,
            ExtractError::Framing(_)      => Stage::Start,
            ExtractError::Fec(_)          => Stage::Unescaped,
            ExtractError::Compression(_)  => Stage::FecDecoded,
            ExtractError::Header(_)       => Stage::Decompressed,
            ExtractError::Output { .. }   => Stage::IntegrityChecked,
        }
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for [`extract_file`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Directory the recovered save is written into.
    pub output_dir: PathBuf,
    /// Fail instead of overwriting an existing file.
    pub no_clobber: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            no_clobber: false,
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// What a successful run recovered.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub errors_corrected: usize,
    pub fec_blocks:       usize,
    pub filename:         String,
    pub save_file_size:   u32,
    pub transmitted_md5:  String,
    pub computed_md5:     String,
    pub md5_matches:      bool,
    pub output_path:      PathBuf,
}

/// Stages 1–4 done: header validated, payload split off.
#[derive(Debug, Clone)]
pub struct DecodedTransmission {
    pub header:           TransmissionHeader,
    pub payload:          Vec<u8>,
    pub errors_corrected: usize,
    pub fec_blocks:       usize,
    progress:             Progress,
}

impl DecodedTransmission {
    pub fn stage(&self) -> Stage {
        self.progress.0
    }

    /// Compare the payload's MD5 with the header's.  Never fails.
    pub fn verify(&self) -> IntegrityReport {
        integrity::verify(&self.payload, &self.header.md5_hash)
    }

    /// Run the integrity check and hand the payload to `sink`, whatever the
    /// check said.
    pub fn deliver(mut self, sink: &mut dyn OutputSink) -> Result<DecodeReport, ExtractError> {
        let check = self.verify();
        self.progress.advance();

        log::info!("Transmitted Filename: {}", self.header.save_filename);
        log::info!("Transmitted Save Size: {}", self.header.save_file_size);
        log::info!("Transmitted MD5: {}", check.expected_hex);
        log::info!("Computed MD5: {}", check.computed_hex);
        if check.is_mismatch() {
            // TODO: confirm with the device owner whether a corrupt save should still be written.
            log::warn!(
                "MD5 mismatch for {}: transmitted {}, computed {}; writing anyway",
                self.header.save_filename, check.expected_hex, check.computed_hex,
            );
        }

        let mut report = DecodeReport {
            errors_corrected: self.errors_corrected,
            fec_blocks:       self.fec_blocks,
            filename:         self.header.save_filename,
            save_file_size:   self.header.save_file_size,
            transmitted_md5:  check.expected_hex,
            computed_md5:     check.computed_hex,
            md5_matches:      check.matches,
            output_path:      PathBuf::new(),
        };

        match sink.write(&report.filename, &self.payload) {
            Ok(path) => {
                self.progress.advance();
                log::info!("Wrote save game {} to {}", report.filename, path.display());
                report.output_path = path;
                Ok(report)
            }
            Err(source) => {
                report.output_path = source.path().to_owned();
                Err(ExtractError::Output { report: Box::new(report), source })
            }
        }
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Runs the pipeline with a pluggable FEC stage.
pub struct Extractor<D: FecDecoder = ReedSolomon> {
    fec: D,
}

impl Extractor<ReedSolomon> {
    pub fn new() -> Self {
        Self { fec: ReedSolomon::new(FecParams::SGEX) }
    }
}

impl Default for Extractor<ReedSolomon> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: FecDecoder> Extractor<D> {
    pub fn with_decoder(fec: D) -> Self {
        Self { fec }
    }

    /// Unescape, FEC-correct, inflate and parse.
    pub fn decode(&self, raw: &[u8]) -> Result<DecodedTransmission, ExtractError> {
        let mut progress = Progress(Stage::Start);

        let unescaped = escape::unescape(raw)?;
        progress.advance();

        let corrected = self.fec.decode(&unescaped)?;
        drop(unescaped);
        progress.advance();
        log::info!("Errors Corrected: {}", corrected.errors_corrected);

        let mut decompressed = codec::inflate(&corrected.data)?;
        progress.advance();

        let header = TransmissionHeader::parse(&decompressed)?;
        let payload = decompressed.split_off(HEADER_SIZE);
        progress.advance();

        Ok(DecodedTransmission {
            header,
            payload,
            errors_corrected: corrected.errors_corrected,
            fec_blocks:       corrected.blocks,
            progress,
        })
    }

    pub fn extract(&self, raw: &[u8], sink: &mut dyn OutputSink) -> Result<DecodeReport, ExtractError> {
        self.decode(raw)?.deliver(sink)
    }
}

// ── Convenience ───────────────────────────────────────────────────────────────

pub fn decode_transmission(raw: &[u8]) -> Result<DecodedTransmission, ExtractError> {
    Extractor::new().decode(raw)
}

pub fn extract(raw: &[u8], sink: &mut dyn OutputSink) -> Result<DecodeReport, ExtractError> {
    Extractor::new().extract(raw, sink)
}

/// Read a capture from disk and write the recovered save per `opts`.
pub fn extract_file<P: AsRef<Path>>(path: P, opts: &ExtractOptions) -> Result<DecodeReport, ExtractError> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .map_err(|source| ExtractError::Input { path: path.to_owned(), source })?;
    log::debug!("read {} byte(s) from {}", raw.len(), path.display());

    let mut sink = FileSink::new(&opts.output_dir).no_clobber(opts.no_clobber);
    extract(&raw, &mut sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fec::FecOutput;
    use crate::transmit::encode_transmission;

    /// Sink that keeps everything in memory.
    #[derive(Default)]
    struct Collect(Vec<(String, Vec<u8>)>);

    impl OutputSink for Collect {
        fn write(&mut self, filename: &str, data: &[u8]) -> Result<PathBuf, SinkError> {
            self.0.push((filename.to_owned(), data.to_vec()));
            Ok(PathBuf::from(filename))
        }
    }

    /// FEC stage that trusts its input; used to feed crafted payloads.
    struct Passthrough;

    impl FecDecoder for Passthrough {
        fn decode(&self, data: &[u8]) -> Result<FecOutput, FecError> {
            Ok(FecOutput { data: data.to_vec(), errors_corrected: 0, blocks: 0 })
        }
    }

    #[test]
    fn stages_advance_in_order() {
        let mut stage = Stage::Start;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(stage, Stage::Written);
    }

    #[test]
    fn progress_only_steps_forward() {
        let mut progress = Progress(Stage::Start);
        assert_eq!(progress.advance(), Stage::Unescaped);
        assert_eq!(progress.advance(), Stage::FecDecoded);
        for _ in 0..4 {
            progress.advance();
        }
        assert_eq!(progress.0, Stage::Written);
        assert_eq!(progress.advance(), Stage::Written);
    }

    #[test]
    fn decode_then_deliver() {
        let raw = encode_transmission("MEMCARD", b"hello saturn").unwrap();
        let decoded = decode_transmission(&raw).unwrap();
        assert_eq!(decoded.stage(), Stage::HeaderParsed);
        assert_eq!(decoded.header.save_filename, "MEMCARD");
        assert_eq!(decoded.payload, b"hello saturn");

        let mut sink = Collect::default();
        let report = decoded.deliver(&mut sink).unwrap();
        assert!(report.md5_matches);
        assert_eq!(sink.0, vec![("MEMCARD".to_owned(), b"hello saturn".to_vec())]);
    }

    #[test]
    fn failures_name_their_stage() {
        let mut sink = Collect::default();

        let err = extract(&[0x54], &mut sink).unwrap_err();
        assert!(matches!(err, ExtractError::Framing(_)));
        assert_eq!(err.stage(), Stage::Start);

        let err = extract(&[1, 2, 3], &mut sink).unwrap_err();
        assert!(matches!(err, ExtractError::Fec(FecError::TruncatedBlock { .. })));
        assert_eq!(err.stage(), Stage::Unescaped);

        let err = Extractor::with_decoder(Passthrough).extract(b"not zlib", &mut sink).unwrap_err();
        assert_eq!(err.stage(), Stage::FecDecoded);

        assert!(sink.0.is_empty());
    }

    #[test]
    fn twenty_byte_transmission_is_too_small() {
        let wire = escape::escape(&codec::deflate(&[0u8; 20], 6).unwrap());
        let mut sink = Collect::default();
        let err = Extractor::with_decoder(Passthrough).extract(&wire, &mut sink).unwrap_err();
        assert!(matches!(err, ExtractError::Header(HeaderError::TooSmall { len: 20 })));
        assert_eq!(err.stage(), Stage::Decompressed);
        assert!(sink.0.is_empty());
    }

    #[test]
    fn sink_failure_is_an_output_error() {
        struct Broken;
        impl OutputSink for Broken {
            fn write(&mut self, filename: &str, _: &[u8]) -> Result<PathBuf, SinkError> {
                Err(SinkError::Exists(PathBuf::from(filename)))
            }
        }

        let raw = encode_transmission("X", b"y").unwrap();
        let err = extract(&raw, &mut Broken).unwrap_err();
        assert_eq!(err.stage(), Stage::IntegrityChecked);

        let ExtractError::Output { report, source } = err else {
            panic!("expected an output error");
        };
        assert!(matches!(source, SinkError::Exists(_)));
        assert_eq!(report.filename, "X");
        assert_eq!(report.save_file_size, 1);
        assert!(report.md5_matches);
        assert_eq!(report.output_path, PathBuf::from("X"));
    }
}
