mod decode;
mod slug;
