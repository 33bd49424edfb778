use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;

pub type SubjectId = String;
pub type YearId = u8;

pub const YEAR_COUNT: usize = 5;
pub const YEAR_LABELS: [&str; YEAR_COUNT] = ["1er Año", "2do Año", "3er Año", "4to Año", "5to Año"];

const ID_LEN: usize = 7;

/// Missing and `null` both read as the empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Displayed status of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Disponible,
    Cursando,
    Regular,
    Aprobada,
    Bloqueada,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Disponible,
        Status::Cursando,
        Status::Regular,
        Status::Aprobada,
        Status::Bloqueada,
    ];

    /// Statuses a student can pick from the status menu. `Disponible` clears
    /// the manual entry.
    pub const MENU: [Status; 4] = [
        Status::Disponible,
        Status::Cursando,
        Status::Regular,
        Status::Aprobada,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "disponible" => Some(Self::Disponible),
            "cursando" => Some(Self::Cursando),
            "regular" => Some(Self::Regular),
            "aprobada" => Some(Self::Aprobada),
            "bloqueada" => Some(Self::Bloqueada),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Disponible => "disponible",
            Self::Cursando => "cursando",
            Self::Regular => "regular",
            Self::Aprobada => "aprobada",
            Self::Bloqueada => "bloqueada",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disponible => "Disponible",
            Self::Cursando => "Cursando",
            Self::Regular => "Regular",
            Self::Aprobada => "Aprobada",
            Self::Bloqueada => "Bloqueada",
        }
    }

    pub fn as_manual(self) -> Option<ManualStatus> {
        match self {
            Self::Cursando => Some(ManualStatus::Cursando),
            Self::Regular => Some(ManualStatus::Regular),
            Self::Aprobada => Some(ManualStatus::Aprobada),
            Self::Disponible | Self::Bloqueada => None,
        }
    }
}

/// Progress value a student sets by hand. The only persisted status state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualStatus {
    Cursando,
    Regular,
    Aprobada,
}

impl From<ManualStatus> for Status {
    fn from(value: ManualStatus) -> Self {
        match value {
            ManualStatus::Cursando => Status::Cursando,
            ManualStatus::Regular => Status::Regular,
            ManualStatus::Aprobada => Status::Aprobada,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrelativeKind {
    /// Satisfied once the dependency is `Regular` or `Aprobada`.
    #[serde(rename = "regular")]
    Regularize,
    /// Satisfied only once the dependency is `Aprobada`.
    #[serde(rename = "aprobada")]
    Approve,
}

impl CorrelativeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "regular" | "regularize" | "regularizar" | "r" => Some(Self::Regularize),
            "aprobada" | "approve" | "aprobar" | "a" => Some(Self::Approve),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Regularize => "regular",
            Self::Approve => "aprobada",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Regularize => "Regularizar",
            Self::Approve => "Aprobar",
        }
    }

    pub fn is_satisfied_by(self, status: Status) -> bool {
        match self {
            Self::Regularize => matches!(status, Status::Regular | Status::Aprobada),
            Self::Approve => status == Status::Aprobada,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlative {
    pub subject_id: SubjectId,
    #[serde(rename = "type")]
    pub kind: CorrelativeKind,
}

impl Correlative {
    pub fn new(subject_id: impl Into<SubjectId>, kind: CorrelativeKind) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correlatives: Vec<Correlative>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Year {
    pub id: YearId,
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subjects: Vec<Subject>,
}

/// Manual statuses keyed by subject id.
///
/// Reading tolerates `"disponible"` and `"bloqueada"` values, which older plan
/// files contain; they mean "no manual status" and are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<SubjectId, Status>")]
pub struct ManualStatusMap(BTreeMap<SubjectId, ManualStatus>);

impl From<BTreeMap<SubjectId, Status>> for ManualStatusMap {
    fn from(raw: BTreeMap<SubjectId, Status>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(id, status)| status.as_manual().map(|manual| (id, manual)))
                .collect(),
        )
    }
}

impl ManualStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ManualStatus> {
        self.0.get(id).copied()
    }

    pub fn insert(&mut self, id: impl Into<SubjectId>, status: ManualStatus) {
        self.0.insert(id.into(), status);
    }

    pub fn remove(&mut self, id: &str) -> Option<ManualStatus> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &ManualStatus)> {
        self.0.iter()
    }
}

/// The whole curriculum: five years of subjects plus the manual status map.
/// This is the document the repository loads, saves, imports and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub years: Vec<Year>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_map: ManualStatusMap,
}

impl Plan {
    pub fn new() -> Self {
        Self {
            years: YEAR_LABELS
                .iter()
                .enumerate()
                .map(|(idx, label)| Year {
                    id: idx as YearId + 1,
                    label: label.to_string(),
                    subjects: Vec::new(),
                })
                .collect(),
            status_map: ManualStatusMap::new(),
        }
    }

    /// All subjects in year order, then in-year order.
    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.years.iter().flat_map(|year| year.subjects.iter())
    }

    pub fn subject_count(&self) -> usize {
        self.years.iter().map(|year| year.subjects.len()).sum()
    }

    pub fn year(&self, year_id: YearId) -> Option<&Year> {
        self.years.iter().find(|year| year.id == year_id)
    }

    pub fn find_subject(&self, id: &str) -> Option<&Subject> {
        self.subjects().find(|subject| subject.id == id)
    }

    pub fn year_of(&self, subject_id: &str) -> Option<&Year> {
        self.years
            .iter()
            .find(|year| year.subjects.iter().any(|subject| subject.id == subject_id))
    }

    /// Looks a subject up by id, then by case-insensitive name.
    pub fn resolve(&self, key: &str) -> Option<&Subject> {
        if let Some(subject) = self.find_subject(key) {
            return Some(subject);
        }
        let wanted = normalize_name(key);
        self.subjects()
            .find(|subject| normalize_name(&subject.name) == wanted)
    }

    pub fn has_subject_named(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.subjects()
            .any(|subject| normalize_name(&subject.name) == wanted)
    }

    pub fn add_subject(
        &mut self,
        year_id: YearId,
        name: &str,
        correlatives: Vec<Correlative>,
    ) -> Result<Subject, ValidationError> {
        if self.year(year_id).is_none() {
            return Err(ValidationError::UnknownYear(year_id));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.has_subject_named(name) {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        let mut seen = HashSet::new();
        for correlative in &correlatives {
            if !seen.insert(correlative.subject_id.as_str()) {
                return Err(ValidationError::DuplicateCorrelative(
                    correlative.subject_id.clone(),
                ));
            }
            if self.find_subject(&correlative.subject_id).is_none() {
                return Err(ValidationError::UnknownSubject(
                    correlative.subject_id.clone(),
                ));
            }
        }

        let subject = Subject {
            id: self.fresh_id(),
            name: name.to_string(),
            correlatives,
        };
        if let Some(year) = self.years.iter_mut().find(|year| year.id == year_id) {
            year.subjects.push(subject.clone());
        }
        debug!(id = %subject.id, year = year_id, "added subject");
        Ok(subject)
    }

    /// Removes a subject and every reference to it. Deleting an unknown id is
    /// a no-op; returns whether anything was removed.
    pub fn delete_subject(&mut self, year_id: YearId, subject_id: &str) -> bool {
        let mut removed = false;
        for year in &mut self.years {
            let before = year.subjects.len();
            if year.id == year_id {
                year.subjects.retain(|subject| subject.id != subject_id);
            }
            removed |= year.subjects.len() != before;
        }
        if !removed {
            // The caller's year may be stale; the id is still unique plan-wide.
            for year in &mut self.years {
                let before = year.subjects.len();
                year.subjects.retain(|subject| subject.id != subject_id);
                removed |= year.subjects.len() != before;
            }
        }
        for year in &mut self.years {
            for subject in &mut year.subjects {
                subject
                    .correlatives
                    .retain(|correlative| correlative.subject_id != subject_id);
            }
        }
        removed |= self.status_map.remove(subject_id).is_some();
        if removed {
            debug!(id = subject_id, "deleted subject");
        }
        removed
    }

    pub fn manual_status(&self, subject_id: &str) -> Option<ManualStatus> {
        self.status_map.get(subject_id)
    }

    pub fn set_manual_status(
        &mut self,
        subject_id: &str,
        status: Status,
    ) -> Result<(), ValidationError> {
        if self.find_subject(subject_id).is_none() {
            return Err(ValidationError::UnknownSubject(subject_id.to_string()));
        }
        match status {
            Status::Bloqueada => Err(ValidationError::StatusNotSettable(status)),
            Status::Disponible => {
                self.status_map.remove(subject_id);
                Ok(())
            }
            other => {
                if let Some(manual) = other.as_manual() {
                    self.status_map.insert(subject_id, manual);
                }
                Ok(())
            }
        }
    }

    fn fresh_id(&self) -> SubjectId {
        loop {
            let candidate: SubjectId = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ID_LEN)
                .collect();
            if self.find_subject(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with_ab() -> (Plan, SubjectId, SubjectId) {
        let mut plan = Plan::new();
        let a = plan.add_subject(1, "Análisis I", Vec::new()).unwrap();
        let b = plan
            .add_subject(
                2,
                "Análisis II",
                vec![Correlative::new(a.id.clone(), CorrelativeKind::Regularize)],
            )
            .unwrap();
        (plan, a.id, b.id)
    }

    #[test]
    fn new_plan_has_five_labelled_years() {
        let plan = Plan::new();
        assert_eq!(plan.years.len(), YEAR_COUNT);
        assert_eq!(plan.years[0].id, 1);
        assert_eq!(plan.years[4].id, 5);
        assert_eq!(plan.years[2].label, "3er Año");
        assert_eq!(plan.subject_count(), 0);
    }

    #[test]
    fn add_subject_trims_name_and_assigns_unique_ids() {
        let mut plan = Plan::new();
        let a = plan.add_subject(1, "  Física I  ", Vec::new()).unwrap();
        let b = plan.add_subject(1, "Física II", Vec::new()).unwrap();
        assert_eq!(a.name, "Física I");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), ID_LEN);
        assert_eq!(plan.year(1).unwrap().subjects.len(), 2);
    }

    #[test]
    fn add_subject_rejects_blank_and_duplicate_names() {
        let mut plan = Plan::new();
        plan.add_subject(1, "Álgebra I", Vec::new()).unwrap();
        assert_eq!(
            plan.add_subject(2, "   ", Vec::new()),
            Err(ValidationError::EmptyName)
        );
        assert_eq!(
            plan.add_subject(3, "álgebra i", Vec::new()),
            Err(ValidationError::DuplicateName("álgebra i".to_string()))
        );
        assert_eq!(plan.subject_count(), 1);
    }

    #[test]
    fn add_subject_rejects_bad_correlatives_without_mutation() {
        let (mut plan, a, _) = plan_with_ab();
        let dup = vec![
            Correlative::new(a.clone(), CorrelativeKind::Regularize),
            Correlative::new(a.clone(), CorrelativeKind::Approve),
        ];
        assert_eq!(
            plan.add_subject(3, "Análisis III", dup),
            Err(ValidationError::DuplicateCorrelative(a.clone()))
        );
        let unknown = vec![Correlative::new("nope", CorrelativeKind::Approve)];
        assert_eq!(
            plan.add_subject(3, "Análisis III", unknown),
            Err(ValidationError::UnknownSubject("nope".to_string()))
        );
        assert_eq!(
            plan.add_subject(9, "Análisis III", Vec::new()),
            Err(ValidationError::UnknownYear(9))
        );
        assert_eq!(plan.subject_count(), 2);
    }

    #[test]
    fn delete_cascades_to_correlatives_and_manual_status() {
        let (mut plan, a, b) = plan_with_ab();
        plan.set_manual_status(&a, Status::Regular).unwrap();
        assert!(plan.delete_subject(1, &a));
        assert!(plan.find_subject(&a).is_none());
        assert!(plan.find_subject(&b).unwrap().correlatives.is_empty());
        assert!(!plan.status_map.contains(&a));
        assert!(!plan.delete_subject(1, &a));
    }

    #[test]
    fn delete_with_stale_year_still_removes_subject() {
        let (mut plan, a, _) = plan_with_ab();
        assert!(plan.delete_subject(4, &a));
        assert!(plan.find_subject(&a).is_none());
    }

    #[test]
    fn year_of_and_resolve() {
        let (plan, a, b) = plan_with_ab();
        assert_eq!(plan.year_of(&b).map(|year| year.id), Some(2));
        assert!(plan.year_of("missing").is_none());
        assert_eq!(plan.resolve("análisis i").map(|s| s.id.clone()), Some(a.clone()));
        assert_eq!(plan.resolve(&a).map(|s| s.name.as_str()), Some("Análisis I"));
    }

    #[test]
    fn manual_status_rules() {
        let (mut plan, a, _) = plan_with_ab();
        plan.set_manual_status(&a, Status::Cursando).unwrap();
        assert_eq!(plan.manual_status(&a), Some(ManualStatus::Cursando));
        plan.set_manual_status(&a, Status::Disponible).unwrap();
        assert_eq!(plan.manual_status(&a), None);
        assert_eq!(
            plan.set_manual_status(&a, Status::Bloqueada),
            Err(ValidationError::StatusNotSettable(Status::Bloqueada))
        );
        assert_eq!(
            plan.set_manual_status("ghost", Status::Regular),
            Err(ValidationError::UnknownSubject("ghost".to_string()))
        );
    }

    #[test]
    fn status_map_drops_derived_values_when_read() {
        let raw = r#"{"a":"cursando","b":"disponible","c":"bloqueada","d":"aprobada"}"#;
        let map: ManualStatusMap = serde_json::from_str(raw).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(ManualStatus::Cursando));
        assert_eq!(map.get("d"), Some(ManualStatus::Aprobada));
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"a":"cursando","d":"aprobada"}"#);
    }

    #[test]
    fn correlative_wire_format_uses_type_tokens() {
        let correlative = Correlative::new("x1", CorrelativeKind::Approve);
        let json = serde_json::to_string(&correlative).unwrap();
        assert_eq!(json, r#"{"subjectId":"x1","type":"aprobada"}"#);
    }
}
