pub mod keyguard;
