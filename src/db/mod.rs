pub mod invitations;
