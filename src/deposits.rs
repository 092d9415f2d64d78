use crate::constants::DEPOSITS_PATH;
use crate::models::{Deposit, DepositDraft};
use crate::resources::{Resource, ResourceService};
use crate::store::ResourceStore;

pub type DepositService = ResourceService<Deposit>;
pub type DepositStore = ResourceStore<Deposit>;

impl Resource for Deposit {
    type Draft = DepositDraft;

    const PATH: &'static str = DEPOSITS_PATH;
    const SINGULAR: &'static str = "deposit";
    const PLURAL: &'static str = "deposits";

    fn id(&self) -> i64 {
        self.id
    }
}
