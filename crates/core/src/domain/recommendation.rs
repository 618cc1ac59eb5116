use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Advisory categories, in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Saving,
    Budget,
    Debt,
    Goals,
    Insurance,
    Education,
    General,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Saving,
        Category::Budget,
        Category::Debt,
        Category::Goals,
        Category::Insurance,
        Category::Education,
        Category::General,
    ];

    /// Bucket name as exposed over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Saving => "ahorro",
            Category::Budget => "presupuesto",
            Category::Debt => "deuda",
            Category::Goals => "metas",
            Category::Insurance => "seguro",
            Category::Education => "educacion",
            Category::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRecommendation {
    pub text: String,
    pub priority: Priority,
}

/// Per-request grouping of classified recommendations. Every category is
/// always present in the serialized output, empty or not, and each bucket
/// preserves engine output order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryBuckets {
    pub ahorro: Vec<ClassifiedRecommendation>,
    pub presupuesto: Vec<ClassifiedRecommendation>,
    pub deuda: Vec<ClassifiedRecommendation>,
    pub metas: Vec<ClassifiedRecommendation>,
    pub seguro: Vec<ClassifiedRecommendation>,
    pub educacion: Vec<ClassifiedRecommendation>,
    pub general: Vec<ClassifiedRecommendation>,
}

impl CategoryBuckets {
    pub fn push(&mut self, category: Category, rec: ClassifiedRecommendation) {
        self.bucket_mut(category).push(rec);
    }

    pub fn bucket(&self, category: Category) -> &[ClassifiedRecommendation] {
        match category {
            Category::Saving => &self.ahorro,
            Category::Budget => &self.presupuesto,
            Category::Debt => &self.deuda,
            Category::Goals => &self.metas,
            Category::Insurance => &self.seguro,
            Category::Education => &self.educacion,
            Category::General => &self.general,
        }
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<ClassifiedRecommendation> {
        match category {
            Category::Saving => &mut self.ahorro,
            Category::Budget => &mut self.presupuesto,
            Category::Debt => &mut self.deuda,
            Category::Goals => &mut self.metas,
            Category::Insurance => &mut self.seguro,
            Category::Education => &mut self.educacion,
            Category::General => &mut self.general,
        }
    }

    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.bucket(*c).len()).sum()
    }
}

/// Result of one advisory request.
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub total: usize,
    pub recomendaciones: Vec<String>,
    pub categorizadas: CategoryBuckets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_seven_buckets_serialize_even_when_empty() {
        let v = serde_json::to_value(CategoryBuckets::default()).unwrap();
        let obj = v.as_object().unwrap();
        for category in Category::ALL {
            assert!(obj.contains_key(category.as_str()), "{}", category.as_str());
        }
        assert_eq!(obj.len(), 7);
    }

    #[test]
    fn priority_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), "high");
        assert_eq!(serde_json::to_value(Priority::Medium).unwrap(), "medium");
        assert_eq!(serde_json::to_value(Priority::Low).unwrap(), "low");
    }
}
