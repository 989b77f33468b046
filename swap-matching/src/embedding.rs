//! Hand-authored category embeddings
//!
//! Each category maps to a fixed vector over five axes:
//! tech, media, apparel, household, leisure.

use swap_core::Category;

pub const EMBEDDING_DIM: usize = 5;

pub type CategoryEmbedding = [f64; EMBEDDING_DIM];

/// Embedding vector for a category
pub fn embedding(category: Category) -> CategoryEmbedding {
    match category {
        Category::Electronics => [0.9, 0.3, 0.0, 0.2, 0.3],
        Category::Books => [0.1, 0.9, 0.0, 0.1, 0.4],
        Category::Clothing => [0.0, 0.1, 0.9, 0.1, 0.2],
        Category::Furniture => [0.1, 0.0, 0.1, 0.9, 0.1],
        Category::Sports => [0.1, 0.1, 0.4, 0.0, 0.9],
        Category::Toys => [0.2, 0.3, 0.0, 0.1, 0.8],
        Category::Games => [0.6, 0.5, 0.0, 0.0, 0.7],
        Category::Music => [0.4, 0.8, 0.0, 0.0, 0.4],
        Category::Home => [0.2, 0.0, 0.1, 0.9, 0.0],
        Category::Collectibles => [0.1, 0.4, 0.2, 0.3, 0.5],
        Category::Other => [0.2, 0.2, 0.2, 0.2, 0.2],
    }
}

/// Component-wise mean of the categories' embeddings, `None` when empty
pub fn average_embedding<I>(categories: I) -> Option<CategoryEmbedding>
where
    I: IntoIterator<Item = Category>,
{
    let mut sum = [0.0; EMBEDDING_DIM];
    let mut count = 0usize;
    for category in categories {
        for (acc, v) in sum.iter_mut().zip(embedding(category)) {
            *acc += v;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for acc in sum.iter_mut() {
        *acc /= count as f64;
    }
    Some(sum)
}
