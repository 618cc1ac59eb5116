//! Keyword classification of engine output. Total and deterministic: every
//! line maps to exactly one category and priority, decided by the first rule
//! in `RULES` whose keyword set matches, independent of how many later rules
//! could also match.

use crate::domain::recommendation::{
    Category, CategoryBuckets, ClassifiedRecommendation, Priority,
};

struct CategoryRule {
    category: Category,
    keywords: &'static [&'static str],
    priority: PriorityRule,
}

enum PriorityRule {
    Fixed(Priority),
    /// High when any marker is present, medium otherwise.
    HighIfAny(&'static [&'static str]),
}

const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Saving,
        keywords: &["ahorro", "fondo de emergencia", "tasa de ahorro"],
        priority: PriorityRule::HighIfAny(&["crea", "incrementa"]),
    },
    CategoryRule {
        category: Category::Budget,
        keywords: &[
            "gasto",
            "presupuesto",
            "vivienda",
            "alimentación",
            "transporte",
            "registra",
        ],
        priority: PriorityRule::HighIfAny(&["superan"]),
    },
    CategoryRule {
        category: Category::Debt,
        keywords: &["deuda", "interés", "apr", "tarjeta", "crédito", "mínimo"],
        priority: PriorityRule::HighIfAny(&["sobreendeudamiento", "apr alta"]),
    },
    CategoryRule {
        category: Category::Goals,
        keywords: &["meta", "jubilación", "smart"],
        priority: PriorityRule::Fixed(Priority::Medium),
    },
    CategoryRule {
        category: Category::Insurance,
        keywords: &["seguro", "testamento", "protección"],
        priority: PriorityRule::HighIfAny(&["no cuentas"]),
    },
    CategoryRule {
        category: Category::Education,
        keywords: &["nivel", "conocimiento", "curso", "simulador", "portafolio"],
        priority: PriorityRule::Fixed(Priority::Low),
    },
];

/// First-match classification over the lowercased text.
pub fn classify(text: &str) -> (Category, Priority) {
    let lower = text.to_lowercase();
    for rule in RULES {
        if rule.keywords.iter().any(|k| lower.contains(k)) {
            let priority = match rule.priority {
                PriorityRule::Fixed(p) => p,
                PriorityRule::HighIfAny(markers) => {
                    if markers.iter().any(|m| lower.contains(m)) {
                        Priority::High
                    } else {
                        Priority::Medium
                    }
                }
            };
            return (rule.category, priority);
        }
    }
    (Category::General, Priority::Low)
}

/// Group recommendations into category buckets, preserving engine output
/// order within each bucket.
pub fn classify_all(recomendaciones: &[String]) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for rec in recomendaciones {
        let (category, priority) = classify(rec);
        buckets.push(
            category,
            ClassifiedRecommendation {
                text: rec.clone(),
                priority,
            },
        );
    }
    buckets
}
