pub mod picture_loss_indication;

pub use picture_loss_indication::PictureLossIndication;
