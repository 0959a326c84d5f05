pub mod category;
pub mod complaint;
pub mod daily_quota;
pub mod points_ledger;
pub mod profile;
pub mod status_history;
pub mod subcategory;

pub use category::{Entity as Category, Model as CategoryModel};
pub use complaint::{ComplaintStatus, Entity as Complaint, Model as ComplaintModel};
pub use daily_quota::{Entity as DailyQuota, Model as DailyQuotaModel};
pub use points_ledger::{Entity as PointsLedger, Model as PointsLedgerModel, PointAction};
pub use profile::{Entity as Profile, Model as ProfileModel, ProfileRole};
pub use status_history::{Entity as StatusHistory, Model as StatusHistoryModel};
pub use subcategory::{Entity as Subcategory, Model as SubcategoryModel};
