//! Canned follow-up questions per category.

use medtutor_core::knowledge::Category;

const GENERAL: &[&str] = &[
    "What are the vital signs and their normal ranges?",
    "Explain the difference between acute and chronic conditions",
    "What is the basic approach to patient history taking?",
];

const SYMPTOM: &[&str] = &[
    "What causes headaches and when should I be concerned?",
    "How do I differentiate between viral and bacterial infections?",
    "What are the red flags for abdominal pain?",
];

const DISEASE: &[&str] = &[
    "What are the most common cardiovascular diseases?",
    "Explain diabetes mellitus and its complications",
    "What are the stages of hypertension?",
];

const ANATOMY: &[&str] = &[
    "Describe the structure and function of the heart",
    "What are the major organs of the digestive system?",
    "Explain the respiratory system anatomy",
];

/// Suggested questions for `category`; categories without a list get the general one.
pub fn suggestions(category: Category) -> Vec<String> {
    let list = match category {
        Category::Symptom => SYMPTOM,
        Category::Disease => DISEASE,
        Category::Anatomy => ANATOMY,
        _ => GENERAL,
    };
    list.iter().map(|s| s.to_string()).collect()
}

/// Like [`suggestions`] but from a raw name; unknown or missing names get the general list.
pub fn suggestions_for(name: Option<&str>) -> Vec<String> {
    let category = name
        .and_then(|n| n.parse::<Category>().ok())
        .unwrap_or_default();
    suggestions(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_has_three() {
        for category in Category::ALL {
            let list = suggestions(category);
            assert_eq!(list.len(), 3);
            assert!(list.len() <= 5);
        }
    }

    #[test]
    fn disease_list() {
        assert_eq!(
            suggestions(Category::Disease)[1],
            "Explain diabetes mellitus and its complications"
        );
    }

    #[test]
    fn unknown_name_falls_back_to_general() {
        assert_eq!(suggestions_for(Some("surgery")), suggestions(Category::General));
        assert_eq!(suggestions_for(None), suggestions(Category::General));
        assert_eq!(suggestions_for(Some("ANATOMY")), suggestions(Category::Anatomy));
    }
}
