//! Edge labels, type tags and content keys shared by the lifecycle

use docgraph_core::Name;

// Root edges; their label is the persisted proposal state
pub const PROPOSAL: Name = Name::from_static("proposal");
pub const PASSED_PROPS: Name = Name::from_static("passedprops");
pub const FAILED_PROPS: Name = Name::from_static("failedprops");

// Membership and ownership
pub const MEMBER: Name = Name::from_static("member");
pub const MEMBER_OF: Name = Name::from_static("memberof");
pub const OWNS: Name = Name::from_static("owns");
pub const OWNED_BY: Name = Name::from_static("ownedby");

/// Edit proposal -> document it edits
pub const ORIGINAL: Name = Name::from_static("original");
/// Time share -> its successor
pub const NEXT_TIME_SHARE: Name = Name::from_static("next_time_share");
/// Time-share proposal -> head of the schedule it extends
pub const SCHEDULE: Name = Name::from_static("schedule");
/// Passed time-share proposal -> time share it created
pub const TIME_SHARE: Name = Name::from_static("time_share");

// Document type tags
pub const DAO_TYPE: Name = Name::from_static("dao");
pub const MEMBER_TYPE: Name = Name::from_static("member");
pub const EDIT_TYPE: Name = Name::from_static("edit");
pub const TIMESHARE_TYPE: Name = Name::from_static("timeshare");

// Content keys
pub const ROOT_NODE_KEY: &str = "root_node";
pub const MEMBER_KEY: &str = "member";
pub const ORIGINAL_DOCUMENT_KEY: &str = "original_document";
pub const TIME_SHARE_KEY: &str = "time_share";
pub const TIME_SHARE_START_DATE_KEY: &str = "time_share_start_date";
pub const SCHEDULE_KEY: &str = "schedule";
