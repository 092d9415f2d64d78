use crate::constants::CATEGORIES_PATH;
use crate::error::ApiResult;
use crate::models::{Category, CategoryDraft, CategoryKind};
use crate::resources::{Resource, ResourceService};
use crate::store::ResourceStore;
use crate::utils::ResourceKey;

pub type CategoryService = ResourceService<Category>;
pub type CategoryStore = ResourceStore<Category>;

impl Resource for Category {
    type Draft = CategoryDraft;

    const PATH: &'static str = CATEGORIES_PATH;
    const SINGULAR: &'static str = "category";
    const PLURAL: &'static str = "categories";

    fn id(&self) -> i64 {
        self.id
    }
}

impl ResourceService<Category> {
    /// `GET /api/categories`, optionally filtered with `?type=`.
    pub async fn list_by_kind(&self, kind: Option<CategoryKind>) -> ApiResult<Vec<Category>> {
        match kind {
            Some(kind) => self.list_with_query(&[("type", kind.as_str())]).await,
            None => self.list().await,
        }
    }

    pub async fn list_income(&self) -> ApiResult<Vec<Category>> {
        self.list_at(&format!("{}/income", CATEGORIES_PATH)).await
    }

    pub async fn list_expense(&self) -> ApiResult<Vec<Category>> {
        self.list_at(&format!("{}/expense", CATEGORIES_PATH)).await
    }
}

// Derived views. Computed on every read, never cached.

pub fn main_categories(items: &[Category]) -> Vec<&Category> {
    items.iter().filter(|c| c.is_main).collect()
}

pub fn income_categories(items: &[Category]) -> Vec<&Category> {
    items.iter().filter(|c| c.is_income).collect()
}

pub fn expense_categories(items: &[Category]) -> Vec<&Category> {
    items.iter().filter(|c| !c.is_income).collect()
}

pub fn main_income_categories(items: &[Category]) -> Vec<&Category> {
    items.iter().filter(|c| c.is_main && c.is_income).collect()
}

pub fn main_expense_categories(items: &[Category]) -> Vec<&Category> {
    items.iter().filter(|c| c.is_main && !c.is_income).collect()
}

/// Children of `parent`, compared after integer normalisation.
pub fn sub_categories<'a>(items: &'a [Category], parent: &ResourceKey) -> Vec<&'a Category> {
    items
        .iter()
        .filter(|c| c.parent_id.is_some_and(|p| parent.matches(p)))
        .collect()
}

fn owned(view: Vec<&Category>) -> Vec<Category> {
    view.into_iter().cloned().collect()
}

impl ResourceStore<Category> {
    pub async fn fetch_all_of_kind(&self, kind: Option<CategoryKind>) {
        let fallback = match kind {
            Some(kind) => format!("Failed to fetch {} categories", kind.as_str()),
            None => "Failed to fetch categories".to_string(),
        };
        self.load_items(self.service().list_by_kind(kind), fallback)
            .await;
    }

    pub async fn fetch_income(&self) {
        self.load_items(
            self.service().list_income(),
            "Failed to fetch income categories".to_string(),
        )
        .await;
    }

    pub async fn fetch_expense(&self) {
        self.load_items(
            self.service().list_expense(),
            "Failed to fetch expense categories".to_string(),
        )
        .await;
    }

    pub async fn main_categories(&self) -> Vec<Category> {
        self.read(|s| owned(main_categories(&s.items))).await
    }

    pub async fn income_categories(&self) -> Vec<Category> {
        self.read(|s| owned(income_categories(&s.items))).await
    }

    pub async fn expense_categories(&self) -> Vec<Category> {
        self.read(|s| owned(expense_categories(&s.items))).await
    }

    pub async fn main_income_categories(&self) -> Vec<Category> {
        self.read(|s| owned(main_income_categories(&s.items))).await
    }

    pub async fn main_expense_categories(&self) -> Vec<Category> {
        self.read(|s| owned(main_expense_categories(&s.items)))
            .await
    }

    pub async fn sub_categories(&self, parent: impl Into<ResourceKey>) -> Vec<Category> {
        let parent = parent.into();
        self.read(|s| owned(sub_categories(&s.items, &parent)))
            .await
    }
}
