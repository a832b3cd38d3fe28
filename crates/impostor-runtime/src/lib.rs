mod dispatch;
mod signals;

pub use dispatch::{
    descriptor_of, dispatch, exit_code, impostor_args, is_self_impostor, ORIGINAL_COMMAND_ENV,
};

#[cfg(test)]
mod tests;
