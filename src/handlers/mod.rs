pub mod invitation_handler;
