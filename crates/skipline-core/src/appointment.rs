/// One bookable appointment type offered by the remote journey.
///
/// `id` is the value submitted on the type-selection step; the journey key
/// (`formJourney<id>`) indexes the per-location continuation tokens in the
/// reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentType {
    pub id: u8,
    pub label: &'static str,
}

pub const APPOINTMENT_TYPES: [AppointmentType; 13] = [
    AppointmentType::new(1, "Driver License - First Time"),
    AppointmentType::new(2, "Driver License Duplicate"),
    AppointmentType::new(3, "Driver License Renewal"),
    AppointmentType::new(4, "Fees"),
    AppointmentType::new(5, "ID Card"),
    AppointmentType::new(6, "Knowledge/Computer Test"),
    AppointmentType::new(7, "Legal Presence"),
    AppointmentType::new(8, "Motorcycle Skills Test"),
    AppointmentType::new(9, "Permits"),
    AppointmentType::new(10, "Teen Driver Level 1"),
    AppointmentType::new(11, "Teen Driver Level 2"),
    AppointmentType::new(12, "Teen Driver Level 3"),
    AppointmentType::new(13, "Non-CDL Road Test"),
];

impl AppointmentType {
    const fn new(id: u8, label: &'static str) -> Self {
        Self { id, label }
    }

    /// Look up a type by its human label.
    ///
    /// Exact matches win; otherwise a case-insensitive, whitespace-trimmed
    /// comparison is attempted.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        if let Some(t) = APPOINTMENT_TYPES.iter().find(|t| t.label == label) {
            return Some(*t);
        }
        let wanted = label.trim();
        APPOINTMENT_TYPES
            .iter()
            .find(|t| t.label.eq_ignore_ascii_case(wanted))
            .copied()
    }

    /// Key under which each location stores its journey content for this type.
    #[must_use]
    pub fn journey_key(&self) -> String {
        format!("formJourney{}", self.id)
    }
}

impl std::fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id {})", self.label, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_exact_match() {
        let t = AppointmentType::from_label("Motorcycle Skills Test").unwrap();
        assert_eq!(t.id, 8);
        assert_eq!(t.journey_key(), "formJourney8");
    }

    #[test]
    fn from_label_ignores_case_and_padding() {
        let t = AppointmentType::from_label("  non-cdl road test ").unwrap();
        assert_eq!(t.id, 13);
    }

    #[test]
    fn from_label_unknown_is_none() {
        assert!(AppointmentType::from_label("Boat License").is_none());
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        for (i, t) in APPOINTMENT_TYPES.iter().enumerate() {
            assert_eq!(usize::from(t.id), i + 1);
        }
    }
}
