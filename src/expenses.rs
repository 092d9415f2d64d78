use crate::constants::EXPENSES_PATH;
use crate::models::{Expense, ExpenseDraft};
use crate::resources::{Resource, ResourceService};
use crate::store::ResourceStore;

pub type ExpenseService = ResourceService<Expense>;
pub type ExpenseStore = ResourceStore<Expense>;

impl Resource for Expense {
    type Draft = ExpenseDraft;

    const PATH: &'static str = EXPENSES_PATH;
    const SINGULAR: &'static str = "expense";
    const PLURAL: &'static str = "expenses";

    fn id(&self) -> i64 {
        self.id
    }
}
