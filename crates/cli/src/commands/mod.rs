pub mod init;
pub mod og;
pub mod prerender;
pub mod serve;
pub mod validate;
