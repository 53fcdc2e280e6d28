/// Portal domain records
///
/// Everything here is plain data plus the pure state transitions of a
/// section's lifecycle. Persistence lives in `crate::store`.
use crate::error::{PortalError, PortalResult};
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Id of the pseudo-step every portal starts on
pub const WELCOME_STEP: &str = "welcome";
/// Id of the closing pseudo-step
pub const THANK_YOU_STEP: &str = "thankYou";

/// Editable portal sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    KeyPeople,
    Locations,
    GroupShots,
    PhotoRequests,
    Timeline,
}

impl SectionKind {
    /// Canonical menu order
    pub const ALL: [SectionKind; 5] = [
        SectionKind::KeyPeople,
        SectionKind::Locations,
        SectionKind::GroupShots,
        SectionKind::PhotoRequests,
        SectionKind::Timeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::KeyPeople => "keyPeople",
            SectionKind::Locations => "locations",
            SectionKind::GroupShots => "groupShots",
            SectionKind::PhotoRequests => "photoRequests",
            SectionKind::Timeline => "timeline",
        }
    }

    /// Step id to section, `None` for pseudo-steps and unknown ids
    pub fn from_step_id(step_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == step_id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::KeyPeople => "Key People",
            SectionKind::Locations => "Locations",
            SectionKind::GroupShots => "Group Shots",
            SectionKind::PhotoRequests => "Photo Requests",
            SectionKind::Timeline => "Timeline",
        }
    }

    /// Hard ceiling on items a draft save may carry
    pub fn max_items(&self) -> usize {
        match self {
            SectionKind::KeyPeople => 10,
            SectionKind::Locations => 6,
            SectionKind::GroupShots => 30,
            SectionKind::PhotoRequests => 5,
            SectionKind::Timeline => 15,
        }
    }

    /// Plural noun used in validation messages
    pub fn item_label(&self) -> &'static str {
        match self {
            SectionKind::KeyPeople => "key people",
            SectionKind::Locations => "locations",
            SectionKind::GroupShots => "group shots",
            SectionKind::PhotoRequests => "photo requests",
            SectionKind::Timeline => "timeline events",
        }
    }

    /// Sections that cannot be skipped unless the photographer says otherwise
    pub fn required_by_default(&self) -> bool {
        matches!(self, SectionKind::Locations | SectionKind::Timeline)
    }
}

impl FromStr for SectionKind {
    type Err = PortalError;

    fn from_str(s: &str) -> PortalResult<Self> {
        Self::from_step_id(s).ok_or_else(|| PortalError::InvalidArgument(format!("Unknown section: {}", s)))
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the next move belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOn {
    Client,
    Photographer,
    None,
}

/// Step status as shown in the portal menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Unlocked,
    InProgress,
    Locked,
    Finalized,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Unlocked => "unlocked",
            StepStatus::InProgress => "inProgress",
            StepStatus::Locked => "locked",
            StepStatus::Finalized => "finalized",
        }
    }
}

/// Photographer's project, the parent of every portal document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub portal_launched: bool,
    pub portal_launched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Portal access token, one per project
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub project_id: String,
    pub token: String,
    pub portal_id: String,
    pub enabled: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("project_id", &self.project_id)
            .field("token", &"<redacted>")
            .field("portal_id", &self.portal_id)
            .field("enabled", &self.enabled)
            .field("expires_at", &self.expires_at)
            .field("access_count", &self.access_count)
            .finish()
    }
}

/// Session counter shared by section configs and the status document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchStats {
    #[serde(default)]
    pub client_access_count: i64,
    #[serde(default)]
    pub last_client_activity: Option<DateTime<Utc>>,
}

impl LaunchStats {
    /// Count a portal launch unless the last activity falls inside `window`.
    /// Activity is refreshed either way. Returns whether the counter moved.
    pub fn register(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        let new_session = match self.last_client_activity {
            None => true,
            Some(last) => now - last > window,
        };
        if new_session {
            self.client_access_count += 1;
        }
        self.last_client_activity = Some(now);
        new_session
    }
}

/// Section-specific config fields the client may edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_locations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_estimated: Option<u32>,
}

/// Lifecycle record of one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub finalized: bool,
    pub locked: bool,
    pub action_on: ActionOn,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub launch: LaunchStats,
    #[serde(flatten)]
    pub fields: SectionFields,
}

impl SectionConfig {
    /// Fresh, client-editable config
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            finalized: false,
            locked: false,
            action_on: ActionOn::Client,
            updated_at: now,
            skipped: false,
            approved_by: None,
            approved_at: None,
            revision_reason: None,
            requested_by: None,
            requested_at: None,
            launch: LaunchStats::default(),
            fields: SectionFields::default(),
        }
    }

    /// Menu status implied by the lifecycle flags
    pub fn status(&self) -> StepStatus {
        if self.finalized {
            StepStatus::Finalized
        } else if self.locked {
            StepStatus::Locked
        } else {
            StepStatus::Unlocked
        }
    }

    /// `finalized ⇒ locked`, and a submitted section waits on the photographer
    pub fn is_consistent(&self) -> bool {
        if self.finalized {
            return self.locked;
        }
        if self.locked {
            return self.action_on == ActionOn::Photographer;
        }
        self.action_on == ActionOn::Client
    }

    /// Client hands the section over for review
    pub fn submit(&mut self, now: DateTime<Utc>) {
        self.locked = true;
        self.action_on = ActionOn::Photographer;
        self.updated_at = now;
    }

    /// Photographer signs the section off
    pub fn approve(&mut self, user_id: &str, now: DateTime<Utc>) {
        self.finalized = true;
        self.locked = true;
        self.action_on = ActionOn::None;
        self.approved_by = Some(user_id.to_string());
        self.approved_at = Some(now);
        self.updated_at = now;
    }

    /// Photographer sends the section back to the client
    pub fn request_revision(&mut self, user_id: &str, reason: &str, now: DateTime<Utc>) {
        self.finalized = false;
        self.locked = false;
        self.skipped = false;
        self.action_on = ActionOn::Client;
        self.revision_reason = Some(reason.to_string());
        self.requested_by = Some(user_id.to_string());
        self.requested_at = Some(now);
        self.updated_at = now;
    }

    /// Client skips an optional section
    pub fn skip(&mut self, now: DateTime<Utc>) {
        self.finalized = true;
        self.locked = true;
        self.skipped = true;
        self.action_on = ActionOn::None;
        self.updated_at = now;
    }
}

/// One record inside a section's item list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionItem {
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A section as read by the client or the photographer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub project_id: String,
    pub kind: SectionKind,
    pub items: Vec<SectionItem>,
    pub config: SectionConfig,
}

/// Entry of the portal menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalStatusEntry {
    pub step_id: String,
    pub step_title: String,
    pub step_status: StepStatus,
    pub action_on: ActionOn,
    pub required_step: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PortalStatusEntry {
    fn pseudo(step_id: &str, title: &str, now: DateTime<Utc>) -> Self {
        Self {
            step_id: step_id.to_string(),
            step_title: title.to_string(),
            step_status: StepStatus::Unlocked,
            action_on: ActionOn::None,
            required_step: false,
            updated_at: Some(now),
        }
    }

    fn section(kind: SectionKind, required: bool, now: DateTime<Utc>) -> Self {
        Self {
            step_id: kind.as_str().to_string(),
            step_title: kind.title().to_string(),
            step_status: StepStatus::Unlocked,
            action_on: ActionOn::Client,
            required_step: required,
            updated_at: Some(now),
        }
    }

    /// Mirror a section's lifecycle flags onto the menu entry
    pub fn mirror(&mut self, config: &SectionConfig, now: DateTime<Utc>) {
        self.step_status = config.status();
        self.action_on = config.action_on;
        self.updated_at = Some(now);
    }
}

/// Ordered menu keyed by step id
///
/// Stored and sent as an ordered array; duplicate ids are rejected when
/// reading it back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepList(IndexMap<String, PortalStatusEntry>);

impl StepList {
    /// `welcome`, the selected sections in menu order, then `thankYou`
    pub fn seed(selected: &[SectionKind], required: &[SectionKind], now: DateTime<Utc>) -> Self {
        let mut steps = IndexMap::new();
        steps.insert(
            WELCOME_STEP.to_string(),
            PortalStatusEntry::pseudo(WELCOME_STEP, "Welcome", now),
        );
        for kind in SectionKind::ALL {
            if selected.contains(&kind) {
                let entry = PortalStatusEntry::section(kind, required.contains(&kind), now);
                steps.insert(kind.as_str().to_string(), entry);
            }
        }
        steps.insert(
            THANK_YOU_STEP.to_string(),
            PortalStatusEntry::pseudo(THANK_YOU_STEP, "Thank You", now),
        );
        Self(steps)
    }

    pub fn get(&self, step_id: &str) -> Option<&PortalStatusEntry> {
        self.0.get(step_id)
    }

    pub fn get_mut(&mut self, step_id: &str) -> Option<&mut PortalStatusEntry> {
        self.0.get_mut(step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.0.contains_key(step_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortalStatusEntry> {
        self.0.values()
    }

    /// Sections present in the menu, in menu order
    pub fn sections(&self) -> Vec<SectionKind> {
        self.0
            .keys()
            .filter_map(|id| SectionKind::from_step_id(id))
            .collect()
    }
}

impl Serialize for StepList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.values())
    }
}

impl<'de> Deserialize<'de> for StepList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<PortalStatusEntry>::deserialize(deserializer)?;
        let mut steps = IndexMap::with_capacity(entries.len());
        for entry in entries {
            if steps.contains_key(&entry.step_id) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate step id: {}",
                    entry.step_id
                )));
            }
            steps.insert(entry.step_id.clone(), entry);
        }
        Ok(Self(steps))
    }
}

/// Completion counters of the status document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalMetadata {
    #[serde(default)]
    pub total_steps: u32,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub completion_percentage: u32,
    #[serde(default)]
    pub section_count: u32,
    #[serde(default)]
    pub required_section_count: u32,
    #[serde(flatten)]
    pub launch: LaunchStats,
}

/// `round(completed / total * 100)`, with a zero total treated as one
pub fn completion_percentage(completed: u32, total: u32) -> u32 {
    let total = total.max(1);
    (f64::from(completed) / f64::from(total) * 100.0).round() as u32
}

impl PortalMetadata {
    /// Every selected section is one step; the pseudo-steps do not count
    pub fn new(section_count: u32, required_section_count: u32) -> Self {
        Self {
            total_steps: section_count,
            completed_steps: 0,
            completion_percentage: 0,
            section_count,
            required_section_count,
            launch: LaunchStats::default(),
        }
    }

    pub fn step_completed(&mut self) {
        self.completed_steps = (self.completed_steps + 1).min(self.total_steps.max(1));
        self.recompute();
    }

    pub fn step_reopened(&mut self) {
        self.completed_steps = self.completed_steps.saturating_sub(1);
        self.recompute();
    }

    /// Set the completed count outright, e.g. when re-seeding a portal
    pub fn set_completed(&mut self, completed: u32) {
        self.completed_steps = completed.min(self.total_steps.max(1));
        self.recompute();
    }

    fn recompute(&mut self) {
        self.completion_percentage = completion_percentage(self.completed_steps, self.total_steps);
    }
}

/// The per-project menu document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalStatus {
    pub project_id: String,
    pub is_setup: bool,
    pub is_enabled: bool,
    pub portal_url: String,
    pub portal_id: String,
    #[serde(rename = "currentStepID")]
    pub current_step_id: String,
    pub steps: StepList,
    pub metadata: PortalMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-02T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_section_kind_round_trips_through_ids() {
        for kind in SectionKind::ALL {
            assert_eq!(kind.as_str().parse::<SectionKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("moodBoard".parse::<SectionKind>().is_err());
        assert_eq!(SectionKind::from_step_id(WELCOME_STEP), None);
    }

    #[test]
    fn test_lifecycle_transitions_keep_invariant() {
        let mut config = SectionConfig::new(now());
        assert!(config.is_consistent());
        assert_eq!(config.status(), StepStatus::Unlocked);

        config.submit(now());
        assert!(config.is_consistent());
        assert_eq!(config.status(), StepStatus::Locked);
        assert_eq!(config.action_on, ActionOn::Photographer);

        config.approve("photographer-1", now());
        assert!(config.locked && config.finalized);
        assert_eq!(config.status(), StepStatus::Finalized);
        assert_eq!(config.action_on, ActionOn::None);

        config.request_revision("photographer-1", "Add the ceremony venue", now());
        assert!(config.is_consistent());
        assert_eq!(config.status(), StepStatus::Unlocked);
        assert_eq!(config.revision_reason.as_deref(), Some("Add the ceremony venue"));

        config.skip(now());
        assert!(config.finalized && config.locked && config.skipped);
    }

    #[test]
    fn test_launch_stats_debounce() {
        let window = Duration::minutes(30);
        let mut stats = LaunchStats::default();

        assert!(stats.register(now(), window));
        assert!(!stats.register(now() + Duration::minutes(10), window));
        assert!(!stats.register(now() + Duration::minutes(35), window));
        assert_eq!(stats.client_access_count, 1);

        // 31 minutes after the last activity
        assert!(stats.register(now() + Duration::minutes(66), window));
        assert_eq!(stats.client_access_count, 2);
        assert_eq!(stats.last_client_activity, Some(now() + Duration::minutes(66)));
    }

    #[test]
    fn test_completion_percentage_rounds() {
        assert_eq!(completion_percentage(2, 5), 40);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(1, 0), 100);
    }

    #[test]
    fn test_seeded_steps_follow_menu_order() {
        let steps = StepList::seed(
            &[SectionKind::Timeline, SectionKind::Locations],
            &[SectionKind::Timeline],
            now(),
        );
        let ids: Vec<&str> = steps.iter().map(|s| s.step_id.as_str()).collect();
        assert_eq!(ids, vec!["welcome", "locations", "timeline", "thankYou"]);
        assert!(steps.get("timeline").unwrap().required_step);
        assert!(!steps.get("locations").unwrap().required_step);
        assert_eq!(steps.sections(), vec![SectionKind::Locations, SectionKind::Timeline]);
    }

    #[test]
    fn test_step_list_serializes_as_array_and_rejects_duplicates() {
        let steps = StepList::seed(&[SectionKind::KeyPeople], &[], now());
        let json = serde_json::to_value(&steps).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[1]["stepId"], "keyPeople");
        assert_eq!(array[1]["stepStatus"], "unlocked");

        let back: StepList = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, steps);

        let mut duplicated = array.clone();
        duplicated.push(array[1].clone());
        assert!(serde_json::from_value::<StepList>(serde_json::Value::Array(duplicated)).is_err());
    }

    #[test]
    fn test_section_config_json_shape() {
        let mut config = SectionConfig::new(now());
        config.fields.multiple_locations = Some(true);
        config.launch.client_access_count = 3;

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["actionOn"], "client");
        assert_eq!(json["multipleLocations"], true);
        assert_eq!(json["clientAccessCount"], 3);
        assert!(json.get("approvedBy").is_none());

        let back: SectionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_access_token_debug_hides_secret() {
        let token = AccessToken {
            project_id: "P1".to_string(),
            token: "deadbeef".to_string(),
            portal_id: "portal-1".to_string(),
            enabled: true,
            created_by: "u1".to_string(),
            created_at: now(),
            expires_at: now() + Duration::days(30),
            access_count: 0,
            last_accessed_at: None,
            disabled_at: None,
        };
        assert!(!format!("{:?}", token).contains("deadbeef"));
    }
}
