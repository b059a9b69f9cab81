pub mod backend;

pub use backend::{
    AudioData, JoinRejected, StreamMetadata, StreamTransport, TranscriptData, TransportEvent, TransportFactory,
};
