use tokio::sync::mpsc;

use pharmavoice::speech::input::{
    InputEvent, ListenGate, PassId, RecognitionErrorKind, RecognitionFailure, RecognitionSignal,
    RejectReason, SpeechInputChannel, StartOutcome,
};
use pharmavoice::speech::output::{OutputEvent, SpeechOutputChannel, SpeechSettings, SynthesisSignal};
use pharmavoice::speech::voice::VoiceInfo;

mod common;
use common::{FakeRecognizer, FakeSynthesizer};

const OPEN: ListenGate = ListenGate { active: true, speaking: false, processing: false };

fn pump(
    channel: &mut SpeechInputChannel,
    rx: &mut mpsc::UnboundedReceiver<RecognitionSignal>,
) -> Vec<InputEvent> {
    let mut events = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        events.extend(channel.accept(signal));
    }
    events
}

fn final_of(text: &str, promoted: bool) -> InputEvent {
    InputEvent::Final { text: text.to_string(), promoted }
}

// === Input ===

#[test]
fn test_input_start_respects_gate() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);

    let cases = [
        (ListenGate { active: false, ..OPEN }, RejectReason::Inactive),
        (ListenGate { speaking: true, ..OPEN }, RejectReason::Speaking),
        (ListenGate { processing: true, ..OPEN }, RejectReason::Processing),
    ];
    for (gate, reason) in cases {
        assert_eq!(input.start(gate).unwrap(), StartOutcome::Rejected(reason));
    }
    assert_eq!(log.lock().unwrap().begins, 0);
    assert!(!input.is_listening());

    assert_eq!(input.start(OPEN).unwrap(), StartOutcome::Started(PassId(1)));
    assert!(input.is_listening());
}

#[test]
fn test_input_unsupported_never_begins() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(FakeRecognizer::unsupported()), tx);

    assert!(!input.is_supported());
    assert_eq!(input.start(OPEN).unwrap(), StartOutcome::Rejected(RejectReason::Unsupported));
}

#[test]
fn test_input_final_then_end() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);
    input.start(OPEN).unwrap();

    let sink = log.lock().unwrap().last_sink();
    sink.started();
    sink.interim("what drugs");
    sink.final_transcript("what drugs treat obesity");
    // At most one final per utterance.
    sink.final_transcript("duplicate");
    sink.end();

    assert_eq!(
        pump(&mut input, &mut rx),
        vec![
            InputEvent::Started,
            InputEvent::Interim("what drugs".to_string()),
            final_of("what drugs treat obesity", false),
            InputEvent::Ended,
        ]
    );
    assert!(!input.is_listening());
}

#[test]
fn test_input_promotes_interim_on_end() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);
    input.start(OPEN).unwrap();

    let sink = log.lock().unwrap().last_sink();
    sink.interim("compare semaglutide");
    sink.end();

    assert_eq!(
        pump(&mut input, &mut rx),
        vec![
            InputEvent::Interim("compare semaglutide".to_string()),
            final_of("compare semaglutide", true),
        ]
    );
}

#[test]
fn test_input_promotes_interim_on_recoverable_error() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);
    input.start(OPEN).unwrap();

    let sink = log.lock().unwrap().last_sink();
    sink.interim("insulin pricing");
    sink.error(RecognitionErrorKind::NoSpeech);
    // The pass is closed; its trailing end is dropped.
    sink.end();

    let events = pump(&mut input, &mut rx);
    assert_eq!(events.last(), Some(&final_of("insulin pricing", true)));
    assert_eq!(events.len(), 2);
}

#[test]
fn test_input_error_classification() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);

    input.start(OPEN).unwrap();
    log.lock().unwrap().last_sink().error(RecognitionErrorKind::Aborted);
    assert_eq!(
        pump(&mut input, &mut rx),
        vec![InputEvent::Failed(RecognitionFailure {
            recoverable: true,
            message: RecognitionErrorKind::Aborted.describe(),
        })]
    );

    input.start(OPEN).unwrap();
    log.lock().unwrap().last_sink().error(RecognitionErrorKind::NotAllowed);
    match pump(&mut input, &mut rx).as_slice() {
        [InputEvent::Failed(f)] => {
            assert!(!f.recoverable);
            assert_eq!(f.message, "Microphone access was denied.");
        }
        other => panic!("unexpected events {:?}", other),
    }

    assert!(RecognitionErrorKind::NoSpeech.is_recoverable());
    assert!(!RecognitionErrorKind::Network.is_recoverable());
    assert!(!RecognitionErrorKind::AudioCapture.is_recoverable());
    assert!(!RecognitionErrorKind::Other("bad-grammar".into()).is_recoverable());
}

#[test]
fn test_input_restart_drops_stale_pass() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);

    input.start(OPEN).unwrap();
    let old = log.lock().unwrap().last_sink();
    assert_eq!(input.start(OPEN).unwrap(), StartOutcome::Started(PassId(2)));
    assert_eq!(log.lock().unwrap().aborts, 1, "previous pass torn down first");

    old.final_transcript("from the old pass");
    old.end();
    assert!(pump(&mut input, &mut rx).is_empty());
    assert_eq!(input.current_pass(), Some(PassId(2)));
}

#[test]
fn test_input_stop_is_idempotent() {
    let (engine, log) = FakeRecognizer::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = SpeechInputChannel::new(Box::new(engine), tx);

    input.start(OPEN).unwrap();
    let sink = log.lock().unwrap().last_sink();
    input.stop();
    input.stop();
    assert_eq!(log.lock().unwrap().aborts, 1);

    // Late signals after stop are ignored.
    sink.final_transcript("too late");
    assert!(pump(&mut input, &mut rx).is_empty());
}

// === Output ===

fn output(engine: FakeSynthesizer) -> SpeechOutputChannel {
    let (tx, _rx) = mpsc::unbounded_channel();
    SpeechOutputChannel::new(Box::new(engine), tx, SpeechSettings::default())
}

#[test]
fn test_output_started_precedes_ended() {
    let (engine, log) = FakeSynthesizer::new(None);
    let mut out = output(engine);

    assert!(out.speak("Metformin is a biguanide.").is_empty());
    assert!(out.is_speaking());
    let id = log.lock().unwrap().spoken[0].id;

    // Engine skipped its start notification.
    assert_eq!(out.accept(SynthesisSignal::Ended(id)), vec![OutputEvent::Started, OutputEvent::Ended]);
    assert!(!out.is_speaking());

    // Exactly one terminal event.
    assert!(out.accept(SynthesisSignal::Ended(id)).is_empty());
}

#[test]
fn test_output_normal_lifecycle() {
    let (engine, log) = FakeSynthesizer::new(None);
    let mut out = output(engine);
    out.speak("Hello");
    let id = log.lock().unwrap().spoken[0].id;

    assert_eq!(out.accept(SynthesisSignal::Started(id)), vec![OutputEvent::Started]);
    assert_eq!(
        out.accept(SynthesisSignal::Failed(id, "device lost".to_string())),
        vec![OutputEvent::Failed("device lost".to_string())]
    );
}

#[test]
fn test_output_empty_text_completes_immediately() {
    let (engine, log) = FakeSynthesizer::new(None);
    let mut out = output(engine);

    assert_eq!(out.speak("   "), vec![OutputEvent::Ended]);
    assert!(log.lock().unwrap().spoken.is_empty());
    assert!(!out.is_speaking());
}

#[test]
fn test_output_new_utterance_cancels_previous() {
    let (engine, log) = FakeSynthesizer::new(None);
    let mut out = output(engine);

    out.speak("first");
    out.speak("second");
    let (first, second) = {
        let log = log.lock().unwrap();
        assert_eq!(log.cancels, 1);
        assert_eq!(log.texts(), vec!["first", "second"]);
        (log.spoken[0].id, log.spoken[1].id)
    };

    assert!(out.accept(SynthesisSignal::Ended(first)).is_empty(), "stale utterance ignored");
    assert_eq!(out.accept(SynthesisSignal::Ended(second)).last(), Some(&OutputEvent::Ended));
}

#[test]
fn test_output_stop_is_idempotent() {
    let (engine, log) = FakeSynthesizer::new(None);
    let mut out = output(engine);

    assert_eq!(out.stop(), None);
    out.speak("a long answer");
    assert_eq!(out.stop(), Some(OutputEvent::Ended));
    assert_eq!(out.stop(), None);
    assert_eq!(log.lock().unwrap().cancels, 1);
}

#[test]
fn test_output_reselects_voice_when_list_loads() {
    let (engine, log) = FakeSynthesizer::new(None);
    let voices = engine.voices.clone();
    let mut out = output(engine);
    assert!(out.selected_voice().is_none());

    voices.lock().unwrap().extend([
        VoiceInfo::new("Alex", "en-US"),
        VoiceInfo::new("Samantha", "en-US"),
    ]);
    assert!(out.accept(SynthesisSignal::VoicesChanged).is_empty());
    assert_eq!(out.selected_voice().map(|v| v.name.as_str()), Some("Samantha"));

    out.speak("Hello");
    let utterance = log.lock().unwrap().spoken[0].clone();
    assert_eq!(utterance.voice.map(|v| v.name), Some("Samantha".to_string()));
    assert_eq!(utterance.settings, SpeechSettings::default());
}
