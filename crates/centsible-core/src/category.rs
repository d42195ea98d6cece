//! Deterministic keyword-based category inference
//!
//! Used as the fallback classifier when an extraction step omits or
//! mangles the category. No model calls, always succeeds. Categories
//! are probed in a fixed priority order and the first keyword hit
//! wins, so a text matching both Food and Entertainment keywords
//! resolves to Food.

use crate::models::Category;

const FOOD_KEYWORDS: &[&str] = &[
    "restaurant", "cafe", "coffee", "pizza", "burger", "burrito", "taco", "sushi", "grocery",
    "groceries", "supermarket", "bakery", "deli", "lunch", "dinner", "breakfast", "food", "dining",
    "chipotle", "starbucks", "mcdonald", "subway", "dunkin",
];

const TRANSPORTATION_KEYWORDS: &[&str] = &[
    "gas", "fuel", "uber", "lyft", "taxi", "parking", "bus", "train", "metro", "transit", "toll",
    "car wash", "shell", "chevron", "exxon",
];

const ENTERTAINMENT_KEYWORDS: &[&str] = &[
    "movie", "cinema", "theater", "theatre", "concert", "netflix", "spotify", "hulu", "arcade",
    "game", "amc", "ticket",
];

const SHOPPING_KEYWORDS: &[&str] = &[
    "amazon", "target", "best buy", "mall", "clothing", "clothes", "shoes", "electronics",
    "apparel", "retail",
];

const BILLS_KEYWORDS: &[&str] = &[
    "rent", "utility", "utilities", "electric", "water bill", "internet", "phone", "insurance",
    "comcast", "verizon", "bill",
];

const HEALTHCARE_KEYWORDS: &[&str] = &[
    "pharmacy", "cvs", "walgreens", "doctor", "dentist", "dental", "hospital", "clinic", "medical",
    "medicine", "prescription",
];

const EDUCATION_KEYWORDS: &[&str] = &[
    "tuition", "textbook", "university", "college", "school", "course", "udemy", "coursera",
];

/// Keyword lists in the same priority order as `Category::ALL`
const KEYWORD_LISTS: [(Category, &[&str]); 7] = [
    (Category::Food, FOOD_KEYWORDS),
    (Category::Transportation, TRANSPORTATION_KEYWORDS),
    (Category::Entertainment, ENTERTAINMENT_KEYWORDS),
    (Category::Shopping, SHOPPING_KEYWORDS),
    (Category::Bills, BILLS_KEYWORDS),
    (Category::Healthcare, HEALTHCARE_KEYWORDS),
    (Category::Education, EDUCATION_KEYWORDS),
];

/// Infer a category from merchant and description text
///
/// Lowercases the concatenation and returns the first category whose
/// keyword list matches; `Other` if nothing does.
pub fn infer_category(merchant: &str, description: &str) -> Category {
    let text = format!("{} {}", merchant, description).to_lowercase();

    for (category, keywords) in KEYWORD_LISTS {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return category;
        }
    }

    Category::Other
}
