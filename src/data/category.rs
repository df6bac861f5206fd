//! Static category table for the bestseller catalog
//!
//! This module contains the fixed list of tracked Amazon bestseller
//! categories. It is the single source of category ids for both the
//! single-category and aggregate fetch paths.

use serde::Serialize;

/// A tracked bestseller category
///
/// Uses `&'static str` for string fields to allow static initialization
/// of the CATEGORIES array.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    /// Upstream category identifier, e.g. "bestsellers_books"
    pub id: &'static str,
    /// Human-readable name shown to users
    pub name: &'static str,
}

/// All verified working category ids
pub static CATEGORIES: [Category; 11] = [
    Category {
        id: "bestsellers_appliances",
        name: "Appliances",
    },
    Category {
        id: "bestsellers_electronics",
        name: "Electronics",
    },
    Category {
        id: "bestsellers_books",
        name: "Books",
    },
    Category {
        id: "bestsellers_sports",
        name: "Sports",
    },
    Category {
        id: "bestsellers_home",
        name: "Home",
    },
    Category {
        id: "bestsellers_kitchen",
        name: "Kitchen",
    },
    Category {
        id: "bestsellers_garden",
        name: "Garden",
    },
    Category {
        id: "bestsellers_office",
        name: "Office",
    },
    Category {
        id: "bestsellers_videogames",
        name: "Video Games",
    },
    Category {
        id: "bestsellers_music",
        name: "Music",
    },
    Category {
        id: "bestsellers_movies",
        name: "Movies",
    },
];

/// Get a category by its id
///
/// # Arguments
///
/// * `id` - The upstream identifier (e.g. "bestsellers_books")
///
/// # Returns
///
/// Returns `Some(&Category)` if found, `None` otherwise
pub fn get_category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|category| category.id == id)
}

/// Get all tracked categories
pub fn all_categories() -> &'static [Category] {
    &CATEGORIES
}
