//! 语音播报
//!
//! 调度文本、叙述与系统通知可被朗读。合成器只是一个能力接口；音色按声明式偏好列表
//! 在可用音色中解析，找不到时回退到第一个 en-US 音色，再回退到第一个英语音色。
//! 终端版本附带的 [`LogSynthesizer`] 不发声，只记录日志。

use std::sync::Arc;

use tracing::debug;

/// 调度 / 系统通知偏好（完全匹配优先，其次包含）
pub const DISPATCH_VOICES: &[&str] = &["Google US English", "Samantha"];
pub const FEMALE_PATIENT_VOICES: &[&str] = &["Google US English", "Zira", "Samantha", "female"];
pub const MALE_PATIENT_VOICES: &[&str] = &["David", "Mark", "Alex", "male"];

/// 可用音色
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// 谁在说话
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceRole {
    /// 调度与系统通知
    Dispatch,
    Patient { female: bool },
}

impl VoiceRole {
    fn preferences(&self) -> &'static [&'static str] {
        match self {
            VoiceRole::Dispatch => DISPATCH_VOICES,
            VoiceRole::Patient { female: true } => FEMALE_PATIENT_VOICES,
            VoiceRole::Patient { female: false } => MALE_PATIENT_VOICES,
        }
    }

    /// (rate, pitch)
    fn prosody(&self) -> (f32, f32) {
        match self {
            VoiceRole::Dispatch => (1.1, 1.05),
            VoiceRole::Patient { female: true } => (1.0, 1.1),
            VoiceRole::Patient { female: false } => (1.0, 0.9),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

fn name_matches(name: &str, pref: &str) -> bool {
    // "male" 不能命中 "female"
    if pref == "male" {
        let lower = name.to_lowercase();
        return lower.contains("male") && !lower.contains("female");
    }
    if pref.chars().all(|c| c.is_lowercase()) {
        name.to_lowercase().contains(pref)
    } else {
        name.contains(pref)
    }
}

/// 按偏好列表解析音色
pub fn select_voice(voices: &[Voice], role: VoiceRole) -> Option<Voice> {
    let us: Vec<&Voice> = voices.iter().filter(|v| v.lang == "en-US").collect();
    role.preferences()
        .iter()
        .find_map(|pref| us.iter().find(|v| name_matches(&v.name, pref)))
        .or_else(|| us.first())
        .copied()
        .or_else(|| voices.iter().find(|v| v.lang.starts_with("en")))
        .cloned()
}

/// 语音合成能力
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<Voice>;

    /// 停止当前播报
    fn cancel(&self);

    fn speak(&self, utterance: Utterance);
}

/// 不发声，只记录
#[derive(Debug, Default)]
pub struct LogSynthesizer;

impl SpeechSynthesizer for LogSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn cancel(&self) {}

    fn speak(&self, utterance: Utterance) {
        debug!(
            "speak [{}] {}",
            utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            utterance.text
        );
    }
}

/// 播报器：持有静音开关，新的播报会打断上一句
pub struct Speaker {
    synth: Arc<dyn SpeechSynthesizer>,
    muted: bool,
}

impl Speaker {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, muted: bool) -> Self {
        Self { synth, muted }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.synth.cancel();
        }
    }

    pub fn say(&self, text: &str, role: VoiceRole) {
        if self.muted || text.trim().is_empty() {
            return;
        }
        self.synth.cancel();
        let (rate, pitch) = role.prosody();
        self.synth.speak(Utterance {
            text: text.to_string(),
            voice: select_voice(&self.synth.voices(), role),
            rate,
            pitch,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Microsoft Zira - English (United States)", "en-US"),
            Voice::new("Microsoft David - English (United States)", "en-US"),
            Voice::new("Daniel", "en-GB"),
        ]
    }

    #[test]
    fn test_select_by_preference() {
        let v = voices();
        assert!(select_voice(&v, VoiceRole::Patient { female: true }).unwrap().name.contains("Zira"));
        assert!(select_voice(&v, VoiceRole::Patient { female: false }).unwrap().name.contains("David"));
        // 没有调度偏好音色时回退到第一个 en-US
        assert!(select_voice(&v, VoiceRole::Dispatch).unwrap().name.contains("Zira"));
    }

    #[test]
    fn test_fallback_to_english_then_none() {
        let gb = vec![Voice::new("Daniel", "en-GB"), Voice::new("Amelie", "fr-CA")];
        assert_eq!(select_voice(&gb, VoiceRole::Dispatch).unwrap().name, "Daniel");
        assert_eq!(select_voice(&[Voice::new("Amelie", "fr-CA")], VoiceRole::Dispatch), None);
    }

    #[test]
    fn test_male_does_not_match_female() {
        let v = vec![
            Voice::new("Generic female", "en-US"),
            Voice::new("Generic male", "en-US"),
        ];
        assert_eq!(
            select_voice(&v, VoiceRole::Patient { female: false }).unwrap().name,
            "Generic male"
        );
    }

    #[derive(Default)]
    struct Recorder {
        spoken: Mutex<Vec<Utterance>>,
        cancels: Mutex<usize>,
    }

    impl SpeechSynthesizer for Recorder {
        fn voices(&self) -> Vec<Voice> {
            voices()
        }

        fn cancel(&self) {
            *self.cancels.lock().unwrap() += 1;
        }

        fn speak(&self, utterance: Utterance) {
            self.spoken.lock().unwrap().push(utterance);
        }
    }

    #[test]
    fn test_speaker_respects_mute() {
        let rec = Arc::new(Recorder::default());
        let mut speaker = Speaker::new(rec.clone(), true);
        speaker.say("Dispatch to unit 51", VoiceRole::Dispatch);
        assert!(rec.spoken.lock().unwrap().is_empty());

        speaker.set_muted(false);
        speaker.say("I can't breathe", VoiceRole::Patient { female: true });
        let spoken = rec.spoken.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].pitch, 1.1);
        assert!(*rec.cancels.lock().unwrap() >= 1);
    }
}
