use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    InPerson,
    Phone,
    Video,
}

impl MeetingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::InPerson => "in_person",
            MeetingType::Phone => "phone",
            MeetingType::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_person" => Some(MeetingType::InPerson),
            "phone" => Some(MeetingType::Phone),
            "video" => Some(MeetingType::Video),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MeetingType::InPerson => "in-person meeting",
            MeetingType::Phone => "phone call",
            MeetingType::Video => "Google Meet",
        }
    }
}

/// The kind of conversation the person asked for, used for event titles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingTopic {
    QuickChat,
    Consultation,
    ProjectMeeting,
    AdvisorySession,
}

impl MeetingTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingTopic::QuickChat => "quick_chat",
            MeetingTopic::Consultation => "consultation",
            MeetingTopic::ProjectMeeting => "project_meeting",
            MeetingTopic::AdvisorySession => "advisory_session",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "quick_chat" => Some(MeetingTopic::QuickChat),
            "consultation" => Some(MeetingTopic::Consultation),
            "project_meeting" => Some(MeetingTopic::ProjectMeeting),
            "advisory_session" => Some(MeetingTopic::AdvisorySession),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MeetingTopic::QuickChat => "Quick Chat",
            MeetingTopic::Consultation => "Consultation",
            MeetingTopic::ProjectMeeting => "Project Meeting",
            MeetingTopic::AdvisorySession => "Advisory Session",
        }
    }
}

/// Everything recognised in a single utterance. Produced fresh per turn and
/// merged into the profile and the pending operation right away.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub date: Option<String>,
    /// Every date mention in the order it was said. `date` is the one the
    /// patterns rank highest, which is not always the first.
    #[serde(default)]
    pub dates: Vec<String>,
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub meeting_type: Option<MeetingType>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub meeting_id: Option<String>,
    pub topic: Option<MeetingTopic>,
}

impl ExtractedEntities {
    /// Video is assumed when nothing in the conversation named a channel.
    pub fn meeting_type_or_default(&self) -> MeetingType {
        self.meeting_type.unwrap_or(MeetingType::Video)
    }

    pub fn has_contact_info(&self) -> bool {
        self.name.is_some() || self.email.is_some() || self.phone.is_some()
    }

    pub fn has_schedule_info(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }
}
