//! Default categories and FAQs for a fresh installation.

use crate::models::{CategoryInput, FaqInput};
use crate::service::SupportService;
use crate::Result;

struct CategorySeed {
    name: &'static str,
    description: &'static str,
    hours: i32,
}

struct FaqSeed {
    question: &'static str,
    answer: &'static str,
    category: &'static str,
    keywords: &'static str,
    order: i32,
}

pub const TECHNICAL: &str = "Technical Issues";
pub const ACADEMIC: &str = "Academic Questions";
pub const BILLING: &str = "Billing";
pub const OTHER: &str = "Other";

const CATEGORIES: [CategorySeed; 4] = [
    CategorySeed {
        name: TECHNICAL,
        description: "Problems with the platform or a course",
        hours: 24,
    },
    CategorySeed {
        name: ACADEMIC,
        description: "Questions about course content",
        hours: 48,
    },
    CategorySeed {
        name: BILLING,
        description: "Payments and invoices",
        hours: 24,
    },
    CategorySeed {
        name: OTHER,
        description: "General enquiries",
        hours: 72,
    },
];

const FAQS: [FaqSeed; 6] = [
    FaqSeed {
        question: "How can I reset my password?",
        answer: "Click \"Forgot your password?\" on the sign-in page and follow the instructions sent to your email.",
        category: TECHNICAL,
        keywords: "password, reset, forgot, recover",
        order: 0,
    },
    FaqSeed {
        question: "How do I get a certificate?",
        answer: "Certificates are issued automatically once you complete the whole course and pass every assessment. Download them from your profile.",
        category: ACADEMIC,
        keywords: "certificate, diploma, complete course",
        order: 1,
    },
    FaqSeed {
        question: "Which payment methods are accepted?",
        answer: "We accept credit and debit cards (Visa, Mastercard, American Express), PayPal and bank transfers.",
        category: BILLING,
        keywords: "payment, invoice, card, paypal, transfer",
        order: 0,
    },
    FaqSeed {
        question: "How do I access my course after buying it?",
        answer: "You will receive a confirmation email. Sign in and the course appears in your student dashboard.",
        category: ACADEMIC,
        keywords: "access, course, purchase, dashboard",
        order: 2,
    },
    FaqSeed {
        question: "Can I get a refund?",
        answer: "Refunds are available within 30 days of purchase. Contact the support team to start a request.",
        category: BILLING,
        keywords: "refund, money back, return",
        order: 1,
    },
    FaqSeed {
        question: "Do courses expire?",
        answer: "No. A purchased course stays available for life, including future updates.",
        category: ACADEMIC,
        keywords: "expiry, access, lifetime, updates",
        order: 3,
    },
];

/// What [`seed_defaults`] created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub faqs: usize,
}

/// Seeds when `seed_defaults` is set in the service's configuration.
pub async fn seed_on_startup(service: &SupportService) -> Result<SeedReport> {
    if !service.config().seed_defaults {
        tracing::info!("Default data seeding disabled");
        return Ok(SeedReport::default());
    }
    seed_defaults(service).await
}

/// Creates the default categories when there are none, then the default
/// published FAQs when there are none. Running it twice changes nothing.
#[tracing::instrument(skip(service))]
pub async fn seed_defaults(service: &SupportService) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let store = service.store();

    if store.list_categories(false).await?.is_empty() {
        for seed in &CATEGORIES {
            service
                .create_category(CategoryInput {
                    name: seed.name.to_string(),
                    description: Some(seed.description.to_string()),
                    active: Some(true),
                    expected_resolution_time_hours: Some(seed.hours),
                })
                .await?;
            report.categories += 1;
        }
        tracing::info!(count = report.categories, "Seeded default categories");
    } else {
        tracing::info!("Categories already present, skipping");
    }

    if store.list_faqs(false, None).await?.is_empty() {
        for seed in &FAQS {
            let category_id = store.find_category_by_name(seed.category).await?.map(|c| c.id);
            let faq = service
                .create_faq(FaqInput {
                    question: seed.question.to_string(),
                    answer: seed.answer.to_string(),
                    category_id,
                    search_keywords: Some(seed.keywords.to_string()),
                    display_order: Some(seed.order),
                    published: Some(true),
                })
                .await?;
            tracing::debug!(faq_id = %faq.faq.id, question = seed.question, "Seeded FAQ");
            report.faqs += 1;
        }
        tracing::info!(count = report.faqs, "Seeded default FAQs");
    } else {
        tracing::info!("FAQs already present, skipping");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_pass_validation() {
        for seed in &CATEGORIES {
            let input = CategoryInput {
                name: seed.name.to_string(),
                expected_resolution_time_hours: Some(seed.hours),
                ..Default::default()
            };
            assert!(crate::validation::category(&input).is_ok(), "{}", seed.name);
        }
        for seed in &FAQS {
            let input = FaqInput {
                question: seed.question.to_string(),
                answer: seed.answer.to_string(),
                ..Default::default()
            };
            assert!(crate::validation::faq(&input).is_ok(), "{}", seed.question);
            assert!(CATEGORIES.iter().any(|c| c.name == seed.category));
        }
    }
}
