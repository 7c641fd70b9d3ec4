// SeaORM entities
// One module per table. Status columns are string-backed active enums.

pub mod comment_debate;
pub mod debate_message;
pub mod entry_interaction;
pub mod flagged_comment;
pub mod group;
pub mod group_member;
pub mod journal_entry;
pub mod member_penalty;
pub mod policy;
pub mod policy_proposal;
pub mod policy_vote;


pub mod prelude {
    // Re-export all entities for convenience
    pub use super::comment_debate::{
        ActiveModel as CommentDebateActiveModel, Column as CommentDebateColumn,
        DebateStatus, Entity as CommentDebate, Model as CommentDebateModel,
    };
    pub use super::debate_message::{
        ActiveModel as DebateMessageActiveModel, Column as DebateMessageColumn,
        Entity as DebateMessage, Model as DebateMessageModel,
    };
    pub use super::entry_interaction::{
        ActiveModel as EntryInteractionActiveModel, Column as EntryInteractionColumn,
        Entity as EntryInteraction, InteractionKind, Model as EntryInteractionModel,
    };
    pub use super::flagged_comment::{
        ActiveModel as FlaggedCommentActiveModel, Column as FlaggedCommentColumn,
        Entity as FlaggedComment, FlagStatus, Model as FlaggedCommentModel,
    };
    pub use super::group::{
        ActiveModel as GroupActiveModel, Column as GroupColumn, Entity as Group,
        Model as GroupModel,
    };
    pub use super::group_member::{
        ActiveModel as GroupMemberActiveModel, Column as GroupMemberColumn,
        Entity as GroupMember, MemberRole, Model as GroupMemberModel,
    };
    pub use super::journal_entry::{
        ActiveModel as JournalEntryActiveModel, Column as JournalEntryColumn,
        Entity as JournalEntry, Model as JournalEntryModel,
    };
    pub use super::member_penalty::{
        ActiveModel as MemberPenaltyActiveModel, Column as MemberPenaltyColumn,
        Entity as MemberPenalty, Model as MemberPenaltyModel, PenaltyType,
    };
    pub use super::policy::{
        ActiveModel as PolicyActiveModel, Column as PolicyColumn, Entity as Policy,
        Model as PolicyModel, PolicyStatus,
    };
    pub use super::policy_proposal::{
        ActiveModel as PolicyProposalActiveModel, ChangeType, Column as PolicyProposalColumn,
        Entity as PolicyProposal, Model as PolicyProposalModel, ProposalStatus,
    };
    pub use super::policy_vote::{
        ActiveModel as PolicyVoteActiveModel, Column as PolicyVoteColumn, Entity as PolicyVote,
        Model as PolicyVoteModel, VoteChoice,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ActiveValue,

        ColumnTrait,
        ConnectionTrait,

        // Database and connection types
        Database,
        DatabaseConnection,
        DatabaseTransaction,
        DbConn,
        // Common result types
        DbErr,

        // Core traits
        EntityTrait,
        ModelTrait,
        NotSet,
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        // Active model helpers
        Set,
        TransactionTrait,
    };
}
