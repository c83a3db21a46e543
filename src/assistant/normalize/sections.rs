//! The four canonical response sections and their stand-in content.

/// Canonical sections, in emission order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    /// `Information` or `Symptoms`.
    Primary,
    /// `Recommendations`.
    Recommendations,
    /// `Medical Disclaimer`.
    Disclaimer,
    /// `Next Steps`.
    NextSteps,
}

impl Section {
    /// All sections in emission order.
    pub const ORDER: [Self; 4] = [
        Self::Primary,
        Self::Recommendations,
        Self::Disclaimer,
        Self::NextSteps,
    ];

    /// Position in [`Section::ORDER`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Recommendations => 1,
            Self::Disclaimer => 2,
            Self::NextSteps => 3,
        }
    }

    /// Bullets used when a response lacks this section.
    #[must_use]
    pub const fn default_bullets(self) -> &'static [&'static str] {
        match self {
            Self::Primary => &["No specific information provided"],
            Self::Recommendations => &[
                "Please consult with a healthcare professional",
                "Keep track of your symptoms",
                "Follow proper health guidelines",
            ],
            Self::Disclaimer => &DISCLAIMER,
            Self::NextSteps => &[
                "Consider scheduling an appointment with your doctor",
                "Document any specific concerns",
                "Follow up with a healthcare professional as needed",
            ],
        }
    }
}

/// Title of the primary section.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PrimaryTitle {
    /// `**Information**`
    #[default]
    Information,
    /// `**Symptoms**`
    Symptoms,
}

/// Medical disclaimer boilerplate.
pub const DISCLAIMER: [&str; 3] = [
    "This information is for general guidance only",
    "Not a substitute for professional medical advice",
    "Consult your healthcare provider for specific advice",
];

/// Exact marker lines recognised by the short-circuit check.
pub const INFORMATION_MARKER: &str = "**Information**";
/// Alternative primary marker.
pub const SYMPTOMS_MARKER: &str = "**Symptoms**";
/// Recommendations marker.
pub const RECOMMENDATIONS_MARKER: &str = "**Recommendations**";
/// Disclaimer marker.
pub const DISCLAIMER_MARKER: &str = "**Medical Disclaimer**";
/// Next steps marker.
pub const NEXT_STEPS_MARKER: &str = "**Next Steps**";

/// Every marker that must appear exactly once in a normalized response.
pub const REQUIRED_MARKERS: [&str; 5] = [
    INFORMATION_MARKER,
    SYMPTOMS_MARKER,
    RECOMMENDATIONS_MARKER,
    DISCLAIMER_MARKER,
    NEXT_STEPS_MARKER,
];

impl Section {
    /// Marker line for this section.
    #[must_use]
    pub const fn marker(self, primary: PrimaryTitle) -> &'static str {
        match (self, primary) {
            (Self::Primary, PrimaryTitle::Information) => INFORMATION_MARKER,
            (Self::Primary, PrimaryTitle::Symptoms) => SYMPTOMS_MARKER,
            (Self::Recommendations, _) => RECOMMENDATIONS_MARKER,
            (Self::Disclaimer, _) => DISCLAIMER_MARKER,
            (Self::NextSteps, _) => NEXT_STEPS_MARKER,
        }
    }
}

/// What a header line names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum HeaderKind {
    /// A canonical section; `Some` when the header chose the primary title.
    Known(Section, Option<PrimaryTitle>),
    /// Anything else; keeps its title.
    Unknown(String),
}

impl HeaderKind {
    /// Classify a header title (without `**` or `#`).
    #[must_use]
    pub fn from_title(title: &str) -> Self {
        let cleaned = title.trim().trim_end_matches(':').trim();
        let key = cleaned
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match key.as_str() {
            "information" => Self::Known(Section::Primary, Some(PrimaryTitle::Information)),
            "symptoms" => Self::Known(Section::Primary, Some(PrimaryTitle::Symptoms)),
            "error" => Self::Known(Section::Primary, None),
            "recommendations" | "recommendation" => Self::Known(Section::Recommendations, None),
            "medical disclaimer" | "disclaimer" => Self::Known(Section::Disclaimer, None),
            "next steps" | "next step" => Self::Known(Section::NextSteps, None),
            _ => Self::Unknown(cleaned.to_string()),
        }
    }
}
