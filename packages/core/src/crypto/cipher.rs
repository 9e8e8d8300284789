// Симметричное шифрование тела сообщения: AES-256-CBC + PKCS7

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub fn aes_256_cbc_encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

pub fn aes_256_cbc_decrypt(
    key: &[u8; 32],
    iv: &[u8; 16],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::CipherError(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }
    Aes256CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::CipherError("bad padding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = [0x01; 32];
        let iv = [0x02; 16];
        let ciphertext = aes_256_cbc_encrypt(&key, &iv, b"hello construct");
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(aes_256_cbc_decrypt(&key, &iv, &ciphertext).unwrap(), b"hello construct");
    }

    #[test]
    fn test_empty_plaintext_is_one_padding_block() {
        let ciphertext = aes_256_cbc_encrypt(&[0x03; 32], &[0x04; 16], b"");
        assert_eq!(ciphertext.len(), 16);
        assert!(aes_256_cbc_decrypt(&[0x03; 32], &[0x04; 16], &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let ciphertext = aes_256_cbc_encrypt(&[0x05; 32], &[0x06; 16], &[9u8; 40]);
        assert!(aes_256_cbc_decrypt(&[0x05; 32], &[0x06; 16], &ciphertext[..20]).is_err());
        assert!(aes_256_cbc_decrypt(&[0x05; 32], &[0x06; 16], &[]).is_err());
    }
}
