//! Static medical knowledge base.
//!
//! Serves two roles: a network-free [`TextGenerator`] backend, and a source of
//! reference context that handlers fold into prompts for model backends.
//! Entries are picked by keyword overlap with the query.

use std::collections::HashSet;
use std::future;

use crate::assistant::router::keywords::tokenize;
use crate::llm::backend::{GenerateFuture, Prompt, TextGenerator};

/// One curated answer with the words that select it.
#[derive(Clone, Copy, Debug)]
pub struct KnowledgeEntry {
    /// Short label for logs.
    pub topic: &'static str,
    /// Lowercase words that point at this entry.
    pub keywords: &'static [&'static str],
    /// Four-section answer.
    pub response: &'static str,
}

const FLU_AND_COLD: KnowledgeEntry = KnowledgeEntry {
    topic: "flu_and_cold",
    keywords: &[
        "flu", "cold", "fever", "chills", "cough", "sore", "throat", "congestion", "sneezing",
        "influenza", "runny", "nose",
    ],
    response: "**Information**
- Fever and chills
- Cough and sore throat
- Body aches and fatigue
- Nasal congestion

**Recommendations**
- Rest and stay hydrated
- Take over-the-counter medications for symptoms
- Monitor temperature
- Seek medical attention if symptoms worsen significantly

**Medical Disclaimer**
- This information is for general guidance only
- Not a substitute for professional medical advice
- Consult your healthcare provider for specific advice

**Next Steps**
- Monitor your symptoms
- Stay home to prevent spreading
- Contact your doctor if symptoms worsen
- Follow proper hygiene practices",
};

const HEART_HEALTH: KnowledgeEntry = KnowledgeEntry {
    topic: "heart_health",
    keywords: &[
        "heart", "cardiac", "cardiovascular", "cholesterol", "blood", "pressure", "hypertension",
        "exercise",
    ],
    response: "**Information**
- Regular exercise is essential for heart health
- A balanced diet plays a crucial role
- Blood pressure monitoring is important
- Sleep and stress management are key factors

**Recommendations**
- Exercise regularly (150 minutes/week)
- Maintain a balanced diet
- Monitor blood pressure
- Get adequate sleep
- Manage stress levels

**Medical Disclaimer**
- This information is for general guidance only
- Not a substitute for professional medical advice
- Consult your healthcare provider for specific advice

**Next Steps**
- Schedule regular check-ups
- Create a personalized exercise plan
- Monitor your blood pressure
- Discuss heart health with your doctor",
};

const BALANCED_DIET: KnowledgeEntry = KnowledgeEntry {
    topic: "balanced_diet",
    keywords: &[
        "diet", "nutrition", "food", "eat", "eating", "meal", "meals", "vegetables", "fruit",
        "protein", "weight", "hydration",
    ],
    response: "**Information**
- A balanced diet includes all essential nutrients
- Proper portion control is important
- Regular meal timing helps maintain health
- Hydration is a key component

**Recommendations**
- Eat plenty of fruits and vegetables (5+ servings daily)
- Choose whole grains (brown rice, whole wheat)
- Include lean proteins (fish, poultry, legumes)
- Consume healthy fats (avocados, nuts, olive oil)
- Stay hydrated with water

**Medical Disclaimer**
- This information is for general guidance only
- Not a substitute for professional medical advice
- Consult your healthcare provider for specific advice

**Next Steps**
- Plan your meals in advance
- Keep a food diary
- Consult a nutritionist if needed
- Make gradual dietary changes",
};

const STRESS_AND_ANXIETY: KnowledgeEntry = KnowledgeEntry {
    topic: "stress_and_anxiety",
    keywords: &[
        "stress", "stressed", "anxiety", "anxious", "panic", "worry", "worried", "relax",
        "sleep", "insomnia", "mental",
    ],
    response: "**Information**
- Stress and anxiety are common experiences
- Various techniques can help manage symptoms
- Lifestyle changes play an important role
- Professional support may be needed

**Recommendations**
- Practice deep breathing exercises
- Engage in regular physical activity
- Maintain a consistent sleep schedule
- Use mindfulness meditation
- Take regular breaks during work

**Medical Disclaimer**
- This information is for general guidance only
- Not a substitute for professional medical advice
- Consult your healthcare provider for specific advice

**Next Steps**
- Start with basic stress management techniques
- Consider professional counseling if needed
- Join support groups
- Develop a daily relaxation routine",
};

/// Answer used when no entry matches.
pub const GENERIC_RESPONSE: &str = "**Information**
- I understand you have a health-related question
- Without proper medical evaluation, I cannot provide specific medical advice
- Please consult a healthcare professional for personalized guidance

**Recommendations**
- Document your symptoms
- Keep track of when they started
- Note any triggers or patterns
- Prepare questions for your healthcare provider

**Medical Disclaimer**
- This information is for general guidance only
- Not a substitute for professional medical advice
- Consult your healthcare provider for specific advice

**Next Steps**
- Schedule an appointment with your doctor
- Bring your symptom history
- Be ready to discuss your concerns
- Follow professional medical advice";

/// Curated entries, searched in order.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(vec![FLU_AND_COLD, HEART_HEALTH, BALANCED_DIET, STRESS_AND_ANXIETY])
    }
}

impl KnowledgeBase {
    /// Build a knowledge base from explicit entries.
    #[must_use]
    pub const fn new(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the knowledge base has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry sharing the most keywords with the query; ties go to the earlier entry.
    #[must_use]
    pub fn best_match(&self, query: &str) -> Option<&KnowledgeEntry> {
        let tokens: HashSet<String> = tokenize(query).collect();
        let mut best: Option<(&KnowledgeEntry, usize)> = None;

        for entry in &self.entries {
            let score = entry
                .keywords
                .iter()
                .filter(|keyword| tokens.contains(**keyword))
                .count();
            if score == 0 {
                continue;
            }
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((entry, score));
            }
        }

        best.map(|(entry, _)| entry)
    }

    /// Answer for a query: the best entry or [`GENERIC_RESPONSE`].
    #[must_use]
    pub fn lookup(&self, query: &str) -> &'static str {
        self.best_match(query)
            .map_or(GENERIC_RESPONSE, |entry| entry.response)
    }
}

/// Backend that answers straight from the knowledge base.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBaseGenerator {
    knowledge: KnowledgeBase,
}

impl KnowledgeBaseGenerator {
    /// Wrap a knowledge base.
    #[must_use]
    pub const fn new(knowledge: KnowledgeBase) -> Self {
        Self { knowledge }
    }
}

impl TextGenerator for KnowledgeBaseGenerator {
    fn name(&self) -> &str {
        "knowledge_base"
    }

    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        let query = if prompt.query.trim().is_empty() {
            &prompt.user
        } else {
            &prompt.query
        };
        let answer = self.knowledge.lookup(query).to_string();
        Box::pin(future::ready(Ok(answer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flu_query_selects_flu_entry() {
        let kb = KnowledgeBase::default();
        let entry = kb.best_match("I think I have the flu, fever since Monday").unwrap();
        assert_eq!(entry.topic, "flu_and_cold");
    }

    #[test]
    fn test_more_overlap_wins() {
        let kb = KnowledgeBase::default();
        let entry = kb
            .best_match("how do I lower blood pressure and keep my heart healthy?")
            .unwrap();
        assert_eq!(entry.topic, "heart_health");
    }

    #[test]
    fn test_unmatched_query_gets_generic_answer() {
        let kb = KnowledgeBase::default();
        assert!(kb.best_match("my elbow clicks").is_none());
        assert_eq!(kb.lookup("my elbow clicks"), GENERIC_RESPONSE);
    }

    #[test]
    fn test_every_entry_has_four_sections() {
        let kb = KnowledgeBase::default();
        assert_eq!(kb.len(), 4);
        for entry in &kb.entries {
            for marker in [
                "**Information**",
                "**Recommendations**",
                "**Medical Disclaimer**",
                "**Next Steps**",
            ] {
                assert_eq!(entry.response.matches(marker).count(), 1, "{}", entry.topic);
            }
        }
    }

    #[tokio::test]
    async fn test_generator_answers_from_query() {
        let generator = KnowledgeBaseGenerator::default();
        let prompt = Prompt::new("system", "long rendered prompt", "feeling stressed and anxious");
        let answer = generator.generate(&prompt).await.unwrap();
        assert!(answer.contains("Stress and anxiety are common experiences"));
    }
}
