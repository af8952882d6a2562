use serde::{Deserialize, Serialize};

use crate::auth::identity::SubscriptionTier;
use crate::billing::plans::{has_access, Feature};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Free,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateFilter {
    #[default]
    All,
    Free,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: TemplateCategory,
    pub features: &'static [&'static str],
    pub trending: bool,
}

impl TemplateDescriptor {
    /// Premium templates need the all-templates feature.
    pub fn is_locked_for(&self, tier: SubscriptionTier) -> bool {
        self.category == TemplateCategory::Premium && !has_access(tier, Feature::AllTemplates)
    }
}

pub const TEMPLATES: &[TemplateDescriptor] = &[
    TemplateDescriptor {
        id: "modern",
        name: "Modern Professional",
        description: "Clean and contemporary design perfect for tech and creative industries",
        category: TemplateCategory::Free,
        features: &["Clean layout", "Professional typography", "Easy to customize"],
        trending: false,
    },
    TemplateDescriptor {
        id: "classic",
        name: "Classic Executive",
        description: "Traditional and formal design ideal for corporate and finance roles",
        category: TemplateCategory::Free,
        features: &["Traditional layout", "Conservative styling", "Corporate approved"],
        trending: false,
    },
    TemplateDescriptor {
        id: "creative",
        name: "Creative Portfolio",
        description: "Bold and artistic design for designers, artists, and creative professionals",
        category: TemplateCategory::Premium,
        features: &["Unique layout", "Visual elements", "Portfolio integration"],
        trending: false,
    },
    TemplateDescriptor {
        id: "minimal",
        name: "Minimal Clean",
        description: "Ultra-minimal design with focus on content and readability",
        category: TemplateCategory::Free,
        features: &["Minimal design", "Focus on content", "Easy to read"],
        trending: false,
    },
    TemplateDescriptor {
        id: "technical",
        name: "Technical Specialist",
        description: "Structured layout perfect for engineers and technical roles",
        category: TemplateCategory::Premium,
        features: &["Technical sections", "Skills focus", "Project highlights"],
        trending: false,
    },
    TemplateDescriptor {
        id: "executive",
        name: "Executive Summary",
        description: "High-level design for senior executives and C-level positions",
        category: TemplateCategory::Premium,
        features: &["Executive layout", "Leadership focus", "Achievement highlights"],
        trending: false,
    },
    TemplateDescriptor {
        id: "neon",
        name: "Neon Futuristic",
        description: "Bold neon accents with dark theme for tech startups and gaming",
        category: TemplateCategory::Premium,
        features: &["Neon accents", "Dark theme", "Futuristic design", "Gaming industry"],
        trending: true,
    },
    TemplateDescriptor {
        id: "glassmorphism",
        name: "Glassmorphism",
        description: "Modern glass effect with blur and transparency",
        category: TemplateCategory::Premium,
        features: &["Glass effect", "Blur effects", "Transparency", "Modern UI"],
        trending: true,
    },
    TemplateDescriptor {
        id: "gradient",
        name: "Gradient Modern",
        description: "Gradient backgrounds with modern typography",
        category: TemplateCategory::Premium,
        features: &["Gradient backgrounds", "Modern typography", "Colorful design"],
        trending: true,
    },
    TemplateDescriptor {
        id: "brutalist",
        name: "Brutalist Bold",
        description: "Bold, geometric design with strong typography for designers",
        category: TemplateCategory::Premium,
        features: &["Bold typography", "Geometric shapes", "Strong contrast", "Designer focused"],
        trending: true,
    },
    TemplateDescriptor {
        id: "ai_optimized",
        name: "AI Optimized",
        description: "ATS-friendly design optimized for automated resume screening",
        category: TemplateCategory::Premium,
        features: &["ATS optimized", "AI friendly", "Keyword focused"],
        trending: true,
    },
    TemplateDescriptor {
        id: "carbon",
        name: "Carbon Dark",
        description: "Professional dark theme with carbon fiber aesthetics",
        category: TemplateCategory::Premium,
        features: &["Dark theme", "Carbon aesthetics", "Professional look", "Tech industry"],
        trending: true,
    },
    TemplateDescriptor {
        id: "minimalist_2024",
        name: "Minimalist 2024",
        description: "Ultra-clean design with modern spacing",
        category: TemplateCategory::Free,
        features: &["Ultra-clean", "Modern spacing", "Free template"],
        trending: true,
    },
    TemplateDescriptor {
        id: "startup",
        name: "Startup Dynamic",
        description: "Dynamic layout for startup founders and entrepreneurs",
        category: TemplateCategory::Premium,
        features: &["Dynamic layout", "Startup focused", "Entrepreneur friendly"],
        trending: true,
    },
];

pub fn find_template(id: &str) -> Option<&'static TemplateDescriptor> {
    TEMPLATES.iter().find(|t| t.id == id)
}

pub fn filter_templates(filter: TemplateFilter) -> Vec<&'static TemplateDescriptor> {
    TEMPLATES
        .iter()
        .filter(|t| match filter {
            TemplateFilter::All => true,
            TemplateFilter::Free => t.category == TemplateCategory::Free,
            TemplateFilter::Premium => t.category == TemplateCategory::Premium,
        })
        .collect()
}
