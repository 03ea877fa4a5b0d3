pub mod console;
pub mod input;
pub mod output;
pub mod voice;

pub use input::{InputEvent, RecognitionEngine, SpeechInputChannel};
pub use output::{OutputEvent, SpeechOutputChannel, SynthesisEngine};
pub use voice::VoiceInfo;
